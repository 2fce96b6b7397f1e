#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::net::Ipv4Addr;

    use beatflow_core::capture::{CaptureRange, CaptureReader, CaptureWriter};
    use beatflow_core::classify::Rule;
    use beatflow_core::config::PipelineConfig;
    use beatflow_core::parser::Metadata;
    use beatflow_core::session::{FilterSession, InspectSession};
    use beatflow_core::telemetry::{Stage, TelemetrySnapshot};
    use beatflow_core::types::StreamError;

    fn udp_packet(sport: u16, dport: u16, payload: usize) -> Vec<u8> {
        let mut p = vec![0u8; 42 + payload];
        p[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
        p[14] = 0x45;
        p[23] = 17;
        p[26..30].copy_from_slice(&Ipv4Addr::LOCALHOST.octets());
        p[30..34].copy_from_slice(&Ipv4Addr::LOCALHOST.octets());
        p[34..36].copy_from_slice(&sport.to_be_bytes());
        p[36..38].copy_from_slice(&dport.to_be_bytes());
        for (i, b) in p[42..].iter_mut().enumerate() {
            *b = i as u8;
        }
        p
    }

    fn arp_packet() -> Vec<u8> {
        let mut p = vec![0u8; 42];
        p[12..14].copy_from_slice(&0x0806u16.to_be_bytes());
        p
    }

    fn capture(packets: &[Vec<u8>]) -> Vec<u8> {
        let mut writer = CaptureWriter::new(Vec::new()).unwrap();
        for p in packets {
            writer.write_packet(p).unwrap();
        }
        writer.finish().unwrap()
    }

    fn drop_rule(sport: u16, dport: u16) -> Rule {
        Rule {
            ip_source: Ipv4Addr::LOCALHOST,
            ip_dest: Ipv4Addr::LOCALHOST,
            udp_source: sport,
            udp_dest: dport,
            drop: true,
        }
    }

    fn filter<const W: usize>(
        input: Vec<u8>,
        config: PipelineConfig,
        rules: Vec<Rule>,
    ) -> Result<(Vec<Vec<u8>>, TelemetrySnapshot), StreamError> {
        let mut reader = CaptureReader::new(Cursor::new(input), config.range)?;
        let mut writer = CaptureWriter::new(Vec::new())?;
        let snapshot = FilterSession::<W>::new(config).with_rules(rules).run(&mut reader, &mut writer)?;

        let out = writer.finish()?;
        let packets = CaptureReader::new(Cursor::new(out), CaptureRange::ALL)?
            .map(|p| p.map(|p| p.data.to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((packets, snapshot))
    }

    fn sample() -> Vec<Vec<u8>> {
        vec![
            udp_packet(1000, 53, 20),
            udp_packet(0x12, 0x0bad, 100),
            arp_packet(),
            udp_packet(0x12, 0x0bad, 3),
            udp_packet(0x12, 0x0bae, 500),
        ]
    }

    #[test]
    fn filter_drops_matching_packets_only() {
        let packets = sample();
        let (out, snap) =
            filter::<32>(capture(&packets), PipelineConfig::default(), vec![drop_rule(0x12, 0x0bad)]).unwrap();

        assert_eq!(out, vec![packets[0].clone(), packets[2].clone(), packets[4].clone()]);

        let c = &snap.counters;
        assert_eq!(c.packets_read, 5);
        assert_eq!(c.packets_forwarded, 3);
        assert_eq!(c.packets_dropped, 2);
        assert_eq!(c.metadata_records, 5);
        assert_eq!(c.beats_encoded, c.beats_decoded);
        assert_eq!(c.bytes_in, packets.iter().map(|p| p.len() as u64).sum::<u64>());
        assert_eq!(c.bytes_out, (packets[0].len() + packets[2].len() + packets[4].len()) as u64);
        assert!((snap.forward_ratio - 0.6).abs() < 1e-9);
        assert!(snap.sanity_check());
        assert!(c.ticks > 0);
    }

    #[test]
    fn beat_width_does_not_change_the_result() {
        let input = capture(&sample());
        let rules = vec![drop_rule(1000, 53)];
        let (o16, _) = filter::<16>(input.clone(), PipelineConfig::default(), rules.clone()).unwrap();
        let (o32, _) = filter::<32>(input.clone(), PipelineConfig::default(), rules.clone()).unwrap();
        let (o64, s64) = filter::<64>(input, PipelineConfig::default(), rules).unwrap();
        assert_eq!(o16, o32);
        assert_eq!(o32, o64);
        assert_eq!(o64.len(), 4);
        assert_eq!(s64.counters.packets_dropped, 1);
    }

    #[test]
    fn default_drop_keeps_nothing_without_rules() {
        let config = PipelineConfig { default_drop: true, ..PipelineConfig::default() };
        let (out, snap) = filter::<32>(capture(&sample()), config, Vec::new()).unwrap();
        assert!(out.is_empty());
        assert_eq!(snap.counters.packets_dropped, 5);
        assert_eq!(snap.forward_ratio, 0.0);
    }

    #[test]
    fn shallow_streams_still_drain() {
        let config = PipelineConfig { stream_depth: 1, ..PipelineConfig::default() };
        let (out, _) = filter::<16>(capture(&sample()), config, vec![drop_rule(0x12, 0x0bad)]).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn range_limits_processed_packets() {
        let config = PipelineConfig::default().with_range(CaptureRange::new(1, 3));
        let (out, snap) = filter::<32>(capture(&sample()), config, vec![drop_rule(0x12, 0x0bad)]).unwrap();
        assert_eq!(out, vec![arp_packet()]);
        assert_eq!(snap.counters.packets_read, 2);
        assert_eq!(snap.counters.packets_out_of_range, 3);
    }

    #[test]
    fn empty_capture_drains_immediately() {
        let (out, snap) = filter::<32>(capture(&[]), PipelineConfig::default(), Vec::new()).unwrap();
        assert!(out.is_empty());
        assert_eq!(snap.counters.packets_read, 0);
        assert_eq!(snap.counters.ticks, 1);
    }

    #[test]
    fn tiny_tick_budget_stalls() {
        let config = PipelineConfig { tick_budget: Some(3), ..PipelineConfig::default() };
        let err = filter::<32>(capture(&sample()), config, Vec::new()).unwrap_err();
        assert!(matches!(err, StreamError::Stalled { ticks: 3 }));
    }

    #[test]
    fn full_rule_table_aborts_before_packets_flow() {
        let config = PipelineConfig { rule_capacity: 1, ..PipelineConfig::default() };
        let err = filter::<32>(capture(&sample()), config, vec![drop_rule(1, 1), drop_rule(2, 2)]).unwrap_err();
        assert!(matches!(err, StreamError::RuleCommand(_)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig { stream_depth: 0, ..PipelineConfig::default() };
        let err = filter::<32>(capture(&sample()), config, Vec::new()).unwrap_err();
        assert!(matches!(err, StreamError::Validation(_)));
    }

    #[test]
    fn stage_timers_are_recorded() {
        let (_, snap) = filter::<32>(capture(&sample()), PipelineConfig::default(), Vec::new()).unwrap();
        assert!(snap.total_stage_time() <= snap.elapsed);
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("packets_forwarded"));
        assert!(snap.stage_times.get(Stage::Encode) <= snap.elapsed);
    }

    #[test]
    fn inspect_reports_metadata_with_ordinals() {
        let packets = sample();
        let config = PipelineConfig::default().with_range(CaptureRange::new(1, 10));
        let mut reader = CaptureReader::new(Cursor::new(capture(&packets)), config.range).unwrap();

        let mut seen: Vec<(u64, Metadata)> = Vec::new();
        let snap = InspectSession::<16>::new(config)
            .run(&mut reader, |ordinal, m| seen.push((ordinal, *m)))
            .unwrap();

        let ordinals: Vec<u64> = seen.iter().map(|(o, _)| *o).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4]);
        assert!(seen[0].1.valid_udp());
        assert_eq!(seen[0].1.udp_dest, 0x0bad);
        assert!(!seen[1].1.valid_ip());
        assert_eq!(seen[1].1.ether_type, 0x0806);
        assert_eq!(seen[3].1.udp_dest, 0x0bae);
        assert_eq!(snap.counters.metadata_records, 4);
        assert_eq!(snap.counters.packets_out_of_range, 1);
    }

    #[test]
    fn oversized_records_are_skipped_not_fatal() {
        let packets = vec![udp_packet(1, 2, 18), udp_packet(3, 4, 1472), udp_packet(5, 6, 18)];
        let config = PipelineConfig { max_packet_len: 100, ..PipelineConfig::default() };

        let (out, snap) = filter::<32>(capture(&packets), config.clone(), Vec::new()).unwrap();
        assert_eq!(out, vec![packets[0].clone(), packets[2].clone()]);
        assert_eq!(snap.counters.packets_read, 2);
        assert_eq!(snap.counters.packets_malformed, 1);

        let mut reader = CaptureReader::new(Cursor::new(capture(&packets)), config.range).unwrap();
        let mut ordinals = Vec::new();
        InspectSession::<16>::new(config)
            .run(&mut reader, |ordinal, _| ordinals.push(ordinal))
            .unwrap();
        assert_eq!(ordinals, vec![0, 2]);
    }

    #[test]
    fn failed_file_run_leaves_no_output() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("beatflow-stall-in-{}.pcap", std::process::id()));
        let output = dir.join(format!("beatflow-stall-out-{}.pcap", std::process::id()));
        std::fs::write(&input, capture(&sample())).unwrap();

        let config = PipelineConfig { tick_budget: Some(1), ..PipelineConfig::default() };
        let err = FilterSession::<32>::new(config).run_files(&input, &output).unwrap_err();
        assert!(matches!(err, StreamError::Stalled { ticks: 1 }));
        assert!(!output.exists());

        let snap = FilterSession::<32>::new(PipelineConfig::default()).run_files(&input, &output).unwrap();
        assert_eq!(snap.counters.packets_forwarded, sample().len() as u64);
        assert!(output.exists());

        std::fs::remove_file(&input).unwrap();
        std::fs::remove_file(&output).unwrap();
    }

    #[test]
    fn config_round_trips_through_json_with_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"stream_depth": 4, "default_drop": true}"#).unwrap();
        assert_eq!(config.stream_depth, 4);
        assert!(config.default_drop);
        assert_eq!(config.range, CaptureRange::ALL);
        assert_eq!(config.max_packet_len, 65_535);
        config.validate().unwrap();

        let rules: Vec<Rule> = serde_json::from_str(
            r#"[{"ip_source": "127.0.0.1", "ip_dest": "127.0.0.1", "udp_source": 18, "udp_dest": 2989, "drop": true}]"#,
        )
        .unwrap();
        assert_eq!(rules[0], drop_rule(18, 2989));
    }
}
