use bytemerge::{
    apply_merge, count_pairs, decode, decode_batch, encode, encode_batch, train, utok, Bpe, Error,
    MergeEvent, Method, StopReason, Strategy, Trainer,
};
use std::ops::ControlFlow;

fn bytes(text: &[u8]) -> Vec<utok> {
    text.iter().map(|&b| b as utok).collect()
}

/// 逐条规则对全文做一次从左到右的替换。
fn encode_by_passes(text: &[u8], model: &Bpe) -> Vec<utok> {
    model
        .merge_rules()
        .iter()
        .fold(bytes(text), |seq, &(pair, id)| apply_merge(&seq, pair, id))
}

#[test]
fn aaabdaaabac() {
    let text = b"aaabdaaabac";
    let mut events = Vec::new();
    let training = Trainer::new(259)
        .train_with(text, |e| {
            events.push(*e);
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(training.stop, StopReason::TargetReached);
    assert_eq!(training.performed(), 3);

    // 第 1 轮：('a', 'a') 出现 4 次
    let seq = bytes(text);
    let counts = count_pairs(&seq);
    assert_eq!(counts.get((97, 97)), 4);
    assert_eq!(counts.most_frequent(), Some(((97, 97), 4)));
    let seq = apply_merge(&seq, (97, 97), 256);
    assert_eq!(seq.len(), 9);
    assert_eq!(
        events[0],
        MergeEvent {
            iteration: 0,
            pair: (97, 97),
            new_id: 256,
            count: 4,
            remaining: 9,
        }
    );

    // 之后两轮由同样的统计与替换推导
    let mut seq = seq;
    for (i, event) in events.iter().enumerate().skip(1) {
        let (pair, count) = count_pairs(&seq).most_frequent().unwrap();
        let id = 256 + i as utok;
        seq = apply_merge(&seq, pair, id);
        assert_eq!(
            *event,
            MergeEvent {
                iteration: i,
                pair,
                new_id: id,
                count,
                remaining: seq.len(),
            }
        );
    }

    // 第 2 轮 (256, 'a') 与 ('a', 'b') 都出现 2 次，先出现的 (256, 'a') 胜出
    assert_eq!(events[1].pair, (256, 97));
    assert_eq!(events[2].pair, (257, 98));

    let model = &training.model;
    assert_eq!(model.decode(256).unwrap(), b"aa");
    assert_eq!(model.decode(257).unwrap(), b"aaa");
    assert_eq!(model.decode(258).unwrap(), b"aaab");
    assert_eq!(encode(text, model).unwrap(), seq);
    assert_eq!(seq, [258, 100, 258, 97, 99]);
}

#[test]
fn strategies_learn_the_same_model() {
    let text = b"aaabdaaabac";
    let incremental = Trainer::new(270)
        .strategy(Strategy::Incremental)
        .train(text)
        .unwrap();
    let recount = Trainer::new(270)
        .strategy(Strategy::Recount)
        .train(text)
        .unwrap();
    assert_eq!(incremental.stop, recount.stop);
    assert_eq!(
        incremental.model.merge_rules(),
        recount.model.merge_rules()
    );
}

#[test]
fn non_overlapping_encode() {
    let model = Bpe::from_merges(256, [((97, 97), 256)]).unwrap();
    assert_eq!(encode(b"aaa", &model).unwrap(), [256, 97]);
}

#[test]
fn out_of_range_decode() {
    let training = train(b"aaabdaaabac", 259).unwrap();
    let e = decode(&[97, 99999], &training.model).unwrap_err();
    assert_eq!(
        e,
        Error::OutOfRangeSymbol {
            id: 99999,
            vocab_size: 259
        }
    );
    assert_eq!(e.to_string(), "symbol 99999 is out of range [0, 258]");
}

#[test]
fn empty_input_is_degenerate() {
    let training = train(b"", 300).unwrap();
    assert_eq!(training.performed(), 0);
    assert_eq!(training.requested, 44);
    assert!(training.is_degenerate());
    assert_eq!(training.model.vocab_size(), 256);
    assert!(encode(b"", &training.model).unwrap().is_empty());
}

#[test]
fn short_input_runs_out_of_pairs() {
    let training = train(b"abcd", 300).unwrap();
    // ab, Xc, Yd 之后只剩一个符号
    assert_eq!(training.performed(), 3);
    assert_eq!(training.stop, StopReason::Exhausted);
    assert_eq!(training.model.vocab_size(), 259);
    assert_eq!(decode(&[258], &training.model).unwrap(), b"abcd");
}

#[test]
fn cancellation_keeps_partial_model() {
    let text = b"hello world of machine learning beautiful you are there";
    let training = Trainer::new(300)
        .train_with(text, |e| {
            if e.iteration == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
    assert_eq!(training.stop, StopReason::Cancelled);
    assert_eq!(training.performed(), 5);
    assert_eq!(training.model.vocab_size(), 261);

    let full = train(text, 300).unwrap().model;
    let learned = training.model.merge_rules();
    assert!(learned.iter().eq(full.merge_rules().iter().take(5)));

    let ids = encode(text, &training.model).unwrap();
    assert_eq!(decode(&ids, &training.model).unwrap(), text);
}

#[test]
fn demo_sentences_round_trip() {
    let model = train(
        b"hello world of machine learning beautiful you are there",
        256 + 10,
    )
    .unwrap()
    .model;
    let texts: [&[u8]; 5] = [
        b"hello machine",
        b"machine learning",
        b"world learning hello",
        b"beautiful hello",
        b"you there",
    ];
    for text in texts {
        let ids = encode(text, &model).unwrap();
        assert!(ids.len() <= text.len());
        assert_eq!(ids, encode_by_passes(text, &model));
        assert_eq!(decode(&ids, &model).unwrap(), text);
    }

    let batch = encode_batch(&texts, &model).unwrap();
    let seqs = batch.iter().map(Vec::as_slice).collect::<Vec<_>>();
    let decoded = decode_batch(&seqs, &model).unwrap();
    assert_eq!(decoded, texts.map(<[u8]>::to_vec));
}

#[test]
fn encoding_training_text_reproduces_working_sequence() {
    let text = b"the cat sat on the mat; the rat sat on the cat";
    let mut remaining = text.len();
    let training = Trainer::new(280)
        .train_with(text, |e| {
            remaining = e.remaining;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(encode(text, &training.model).unwrap().len(), remaining);
}

#[test]
fn rebuilt_model_matches_trained_model() {
    let text = b"abracadabra abracadabra";
    let trained = train(text, 270).unwrap().model;
    let rules = trained.merge_rules().iter().copied();
    let rebuilt = Bpe::from_merges(256, rules).unwrap();
    assert_eq!(rebuilt.vocab_size(), trained.vocab_size());
    for id in 0..trained.vocab_size() as utok {
        assert_eq!(rebuilt.decode(id).unwrap(), trained.decode(id).unwrap());
    }
    let ids = encode(text, &trained).unwrap();
    assert_eq!(encode(text, &rebuilt).unwrap(), ids);
}
