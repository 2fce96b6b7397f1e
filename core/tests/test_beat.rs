#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use proptest::prelude::*;

    use beatflow_core::beat::{
        beat_count, decode_all, encode_into, encode_packet, Beat, BeatError, BeatIter, DecodeEvent,
        Decoder, Encoder, KeepMask,
    };
    use beatflow_core::dataflow::Stream;
    use beatflow_core::types::StreamError;

    fn packet(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn keep_mask_leading_convention() {
        assert_eq!(KeepMask::leading(0), KeepMask::EMPTY);
        assert_eq!(KeepMask::leading(3).bits(), 0b111);
        assert_eq!(KeepMask::leading(64).bits(), u64::MAX);
        assert_eq!(KeepMask::full(32).count(), 32);

        assert!(KeepMask::from_bits(0b0111).is_leading_contiguous());
        assert!(!KeepMask::from_bits(0b1110).is_leading_contiguous());
        assert!(!KeepMask::from_bits(0b1011).is_leading_contiguous());
        assert_eq!(KeepMask::from_bits(0b1011).leading_valid(), 2);
    }

    #[test]
    fn exact_multiple_ends_with_full_last_beat() {
        let beats = encode_packet::<32>(&packet(64)).unwrap();
        assert_eq!(beats.len(), 2);
        assert!(!beats[0].last);
        assert!(beats[1].last);
        assert_eq!(beats[1].keep, KeepMask::full(32));
    }

    #[test]
    fn short_tail_is_zero_padded() {
        let beats = encode_packet::<16>(&packet(20)).unwrap();
        assert_eq!(beats.len(), 2);
        let tail = beats[1];
        assert_eq!(tail.keep.bits(), 0b1111);
        assert_eq!(tail.valid_len(), 4);
        assert_eq!(tail.payload(), &packet(20)[16..]);
        assert!(tail.data[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn single_byte_packet() {
        let beats = encode_packet::<64>(&[0xab]).unwrap();
        assert_eq!(beats.len(), 1);
        assert!(beats[0].last);
        assert_eq!(beats[0].keep.bits(), 1);
    }

    #[test]
    fn empty_and_oversized_packets_rejected() {
        assert_eq!(encode_packet::<32>(&[]).unwrap_err(), BeatError::EmptyPacket);
        let err = encode_packet::<32>(&packet(65_536)).unwrap_err();
        assert_eq!(err, BeatError::PacketTooLong { len: 65_536, max: 65_535 });
    }

    #[test]
    fn beat_new_validates_keep() {
        let data = [0u8; 8];
        assert!(Beat::<8>::new(data, KeepMask::full(8), false).is_ok());
        assert!(Beat::<8>::new(data, KeepMask::leading(5), true).is_ok());

        assert_eq!(
            Beat::<8>::new(data, KeepMask::leading(5), false).unwrap_err(),
            BeatError::TruncatedBeat { keep: 0b1_1111 }
        );
        assert_eq!(
            Beat::<8>::new(data, KeepMask::EMPTY, true).unwrap_err(),
            BeatError::InvalidKeep { keep: 0, width: 8 }
        );
        // trailing-valid keep is not accepted
        assert!(matches!(
            Beat::<8>::new(data, KeepMask::from_bits(0b1111_0000), true),
            Err(BeatError::InvalidKeep { .. })
        ));
        // bits beyond the beat width
        assert!(matches!(
            Beat::<8>::new(data, KeepMask::leading(9), true),
            Err(BeatError::InvalidKeep { .. })
        ));
    }

    #[test]
    fn summary_shows_payload_hex() {
        let beats = encode_packet::<4>(&[0xde, 0xad, 0xbe]).unwrap();
        let s = beats[0].summary();
        assert!(s.contains("deadbe"), "summary was {s}");
        assert!(s.contains("last: true"));
    }

    #[test]
    fn encode_into_is_all_or_nothing() {
        let out: Stream<Beat<16>> = Stream::new("out", 3);
        out.try_write(encode_packet::<16>(&[1]).unwrap()[0]).unwrap();

        // Needs 3 slots, only 2 free.
        let err = encode_into::<16>(&packet(40), &out).unwrap_err();
        assert!(matches!(err, StreamError::StreamFull { stream: "out" }));
        assert_eq!(out.len(), 1);

        assert_eq!(encode_into::<16>(&packet(32), &out).unwrap(), 2);
        assert!(out.is_full());
    }

    #[test]
    fn encoder_emits_one_beat_per_step_and_respects_backpressure() {
        let out: Stream<Beat<8>> = Stream::new("out", 2);
        let mut enc = Encoder::<8>::default();
        assert!(enc.is_idle());
        enc.load(Bytes::from(packet(20))).unwrap();
        assert_eq!(enc.load(Bytes::from_static(b"x")).unwrap_err(), BeatError::EncoderBusy);

        assert!(enc.step(&out));
        assert!(enc.step(&out));
        // full: no-op
        assert!(!enc.step(&out));
        assert_eq!(enc.beats_emitted(), 2);

        out.try_read().unwrap();
        assert!(enc.step(&out));
        assert!(enc.is_idle());
        assert!(!enc.step(&out));
    }

    #[test]
    fn encoder_honours_max_len() {
        let mut enc = Encoder::<8>::new(10);
        assert_eq!(
            enc.load(Bytes::from(packet(11))).unwrap_err(),
            BeatError::PacketTooLong { len: 11, max: 10 }
        );
        assert!(enc.is_idle());
    }

    #[test]
    fn decoder_applies_decisions_in_order() {
        let beats: Stream<Beat<8>> = Stream::new("beats", 16);
        let drops: Stream<bool> = Stream::new("drops", 4);
        let mut dec = Decoder::<8>::default();

        for (i, len) in [12usize, 3, 17].iter().enumerate() {
            encode_into::<8>(&packet(*len), &beats).unwrap();
            drops.try_write(i % 2 == 1).unwrap();
        }

        let mut forwarded = Vec::new();
        let mut dropped = Vec::new();
        loop {
            match dec.step(&beats, &drops).unwrap() {
                DecodeEvent::Idle => break,
                DecodeEvent::Buffered => {}
                DecodeEvent::Forwarded(p) => forwarded.push(p),
                DecodeEvent::Dropped { len } => dropped.push(len),
            }
        }
        assert_eq!(forwarded, vec![Bytes::from(packet(12)), Bytes::from(packet(17))]);
        assert_eq!(dropped, vec![3]);
        assert_eq!(dec.beats_consumed(), 2 + 1 + 3);
        dec.finish().unwrap();
    }

    #[test]
    fn decoder_underrun_is_fatal() {
        let beats: Stream<Beat<8>> = Stream::new("beats", 4);
        let drops: Stream<bool> = Stream::new("drops", 1);
        let mut dec = Decoder::<8>::default();
        encode_into::<8>(&packet(10), &beats).unwrap();

        assert_eq!(dec.step(&beats, &drops).unwrap(), DecodeEvent::Buffered);
        let err = dec.step(&beats, &drops).unwrap_err();
        assert!(matches!(err, StreamError::ClassificationUnderrun { len: 10 }));
        assert_eq!(dec.buffered(), 0);
        dec.finish().unwrap();
    }

    #[test]
    fn decoder_discards_oversized_packet() {
        let beats: Stream<Beat<8>> = Stream::new("beats", 4);
        let drops: Stream<bool> = Stream::new("drops", 1);
        let mut dec = Decoder::<8>::new(10);
        encode_into::<8>(&packet(16), &beats).unwrap();

        assert_eq!(dec.step(&beats, &drops).unwrap(), DecodeEvent::Buffered);
        let err = dec.step(&beats, &drops).unwrap_err();
        assert!(matches!(err, StreamError::Beat(BeatError::PacketTooLong { len: 16, max: 10 })));
        assert_eq!(dec.buffered(), 0);
        dec.finish().unwrap();
    }

    #[test]
    fn decoder_rejects_truncated_body_beat() {
        let beats: Stream<Beat<8>> = Stream::new("beats", 1);
        let drops: Stream<bool> = Stream::new("drops", 1);
        let mut bad = encode_packet::<8>(&packet(16)).unwrap()[0];
        bad.keep = KeepMask::leading(7);
        beats.try_write(bad).unwrap();

        let err = Decoder::<8>::default().step(&beats, &drops).unwrap_err();
        assert!(matches!(err, StreamError::Beat(BeatError::TruncatedBeat { keep: 0x7f })));
    }

    #[test]
    fn decoder_finish_detects_partial_packet() {
        let beats: Stream<Beat<8>> = Stream::new("beats", 4);
        let drops: Stream<bool> = Stream::new("drops", 1);
        let mut dec = Decoder::<8>::default();
        beats.try_write(encode_packet::<8>(&packet(16)).unwrap()[0]).unwrap();

        dec.step(&beats, &drops).unwrap();
        assert_eq!(dec.buffered(), 8);
        assert_eq!(dec.finish().unwrap_err(), BeatError::IncompletePacket { buffered: 8 });
    }

    #[test]
    fn decode_all_requires_closing_beat() {
        let beats = encode_packet::<8>(&packet(16)).unwrap();
        let err = decode_all(&beats[..1]).unwrap_err();
        assert!(matches!(err, StreamError::Beat(BeatError::IncompletePacket { buffered: 8 })));
    }

    proptest! {
        #[test]
        fn prop_round_trip_w32(data in proptest::collection::vec(any::<u8>(), 1..600)) {
            let beats = encode_packet::<32>(&data).unwrap();
            let packets = decode_all(&beats).unwrap();
            prop_assert_eq!(packets.len(), 1);
            prop_assert_eq!(&packets[0][..], &data[..]);
        }

        #[test]
        fn prop_beat_shape(len in 1usize..2000) {
            let data = packet(len);
            let beats: Vec<Beat<16>> = BeatIter::<16>::new(&data).unwrap().collect();

            prop_assert_eq!(beats.len(), beat_count(len, 16));
            let total: usize = beats.iter().map(|b| b.validate().unwrap()).sum();
            prop_assert_eq!(total, len);

            let (last, body) = beats.split_last().unwrap();
            prop_assert!(last.last);
            for beat in body {
                prop_assert!(!beat.last);
                prop_assert_eq!(beat.keep, KeepMask::full(16));
            }
        }

        #[test]
        fn prop_streaming_matches_batch(lens in proptest::collection::vec(1usize..200, 1..8)) {
            let beats: Stream<Beat<64>> = Stream::new("beats", 4);
            let drops: Stream<bool> = Stream::new("drops", lens.len());
            let mut enc = Encoder::<64>::default();
            let mut dec = Decoder::<64>::default();
            for _ in &lens {
                drops.try_write(false).unwrap();
            }

            let mut pending = lens.iter().map(|l| packet(*l));
            let mut out = Vec::new();
            loop {
                if enc.is_idle() {
                    if let Some(p) = pending.next() {
                        enc.load(Bytes::from(p)).unwrap();
                    }
                }
                enc.step(&beats);
                match dec.step(&beats, &drops).unwrap() {
                    DecodeEvent::Forwarded(p) => out.push(p.len()),
                    DecodeEvent::Idle if enc.is_idle() && beats.is_empty() => break,
                    _ => {}
                }
            }
            prop_assert_eq!(out, lens);
        }
    }
}
