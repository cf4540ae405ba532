//! Integration tests: exercise the full apply→save→replay flow against a
//! simulated device.
//!
//! Each test drives the session, the store and the replay engine together,
//! asserting on the exact transfers the simulated device receives.

#[cfg(test)]
mod tests {
    use crate::encoder::{self, LightingMode};
    use crate::error::Error;
    use crate::product::{self, G203, G213};
    use crate::replay::{self, ReplayOutcome};
    use crate::session::Session;
    use crate::store;
    use crate::transport::mock::{Call, MockBackend};
    use tempfile::TempDir;

    fn releases(mock: &MockBackend) -> usize {
        mock.count(|c| matches!(c, Call::Release(_)))
    }

    /// Apply a setting, persist it, then replay it on a freshly booted device.
    #[test]
    fn apply_save_and_replay_static_color() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("G213.conf");

        let desk = MockBackend::new().with_kernel_driver();
        let mode = LightingMode::Static { color: 0xff00aa };
        let commands = {
            let session = Session::open(&desk, &G213).unwrap();
            session.apply(&mode).unwrap()
        };
        store::save(G213.name, &commands, &path).unwrap();
        assert!(desk.driver_active());

        let boot = MockBackend::new().with_kernel_driver();
        let outcome = replay::apply_from_file(&boot, &path).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(boot.payloads(), desk.payloads());
        assert_eq!(
            hex::encode(&boot.payloads()[0]),
            "11ff0c3a0001ff00aa0200000000000000000000"
        );
        assert!(boot.driver_active());
    }

    /// Five stored segment commands; the third transfer fails.
    #[test]
    fn replay_stops_at_failed_segment_and_still_disconnects() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("G213.conf");
        let colors = [0x100000, 0x200000, 0x300000, 0x400000, 0x500000];
        let commands = encoder::encode_segments(&G213, &colors).unwrap();
        store::save("G213", &commands, &path).unwrap();

        let mock = MockBackend::new().with_kernel_driver().fail_transfer_at(3);
        let outcome = replay::apply_from_file(&mock, &path).unwrap();

        match outcome {
            ReplayOutcome::Partial {
                product,
                applied,
                total,
                error,
            } => {
                assert_eq!(product, "G213");
                assert_eq!(applied, 2);
                assert_eq!(total, 5);
                assert!(matches!(error, Error::TransferFailed(_)));
            }
            other => panic!("expected partial replay, got {other:?}"),
        }

        let sent: Vec<Vec<u8>> = commands[..3]
            .iter()
            .map(|c| c.to_bytes().unwrap())
            .collect();
        assert_eq!(mock.payloads(), sent);
        assert_eq!(releases(&mock), 1);
        assert!(mock.driver_active());
    }

    /// A G213 replay reads an acknowledgement after every command; G203 never does.
    #[test]
    fn replay_ack_reads_follow_profile() {
        let temp_dir = TempDir::new().unwrap();

        let g213_path = temp_dir.path().join("G213.conf");
        let g213_cmds = encoder::encode_segments(&G213, &[0; 5]).unwrap();
        store::save("G213", &g213_cmds, &g213_path).unwrap();
        let mock = MockBackend::new();
        replay::apply_from_file(&mock, &g213_path).unwrap();
        assert_eq!(mock.count(|c| matches!(c, Call::Interrupt { .. })), 5);

        let g203_path = temp_dir.path().join("G203.conf");
        let g203_cmds = encoder::encode_segments(&G203, &[0; 5]).unwrap();
        store::save("G203", &g203_cmds, &g203_path).unwrap();
        let mock = MockBackend::new();
        replay::apply_from_file(&mock, &g203_path).unwrap();
        assert_eq!(mock.count(|c| matches!(c, Call::Interrupt { .. })), 0);
    }

    /// G203 cycle at 5000 ms carries 0x1388 in its speed slot end to end.
    #[test]
    fn g203_cycle_through_session() {
        let mock = MockBackend::new();
        let session = Session::open(&mock, &G203).unwrap();
        session.send_cycle(5000).unwrap();
        let payload = &mock.payloads()[0];
        assert_eq!(&payload[11..13], &[0x13, 0x88]);
        assert_eq!(payload.len(), 20);
    }

    /// A failed segment write leaves nothing to persist.
    #[test]
    fn failed_apply_returns_no_commands() {
        let mock = MockBackend::new().fail_transfer_at(4);
        let session = Session::open(&mock, &G213).unwrap();
        let result = session.apply(&LightingMode::Segments { colors: [0xffffff; 5] });
        assert!(result.is_err());
        assert_eq!(mock.count(|c| matches!(c, Call::Control { .. })), 4);
    }

    /// Validation failures reach neither the device nor the file.
    #[test]
    fn invalid_speed_never_opens_device() {
        let mock = MockBackend::new();
        let session = Session::new(&mock, &G213);
        assert!(matches!(
            session.apply(&LightingMode::Cycle { speed_ms: 65_536 }),
            Err(Error::InvalidSpeed { .. })
        ));
        assert!(mock.calls().is_empty());
    }

    /// Sessions for different products may be open at the same time.
    #[test]
    fn independent_sessions_per_product() {
        let mock = MockBackend::new();
        let keyboard = Session::open(&mock, &G213).unwrap();
        let mouse = Session::open(&mock, &G203).unwrap();
        keyboard.send_cycle(1000).unwrap();
        mouse.send_cycle(1000).unwrap();
        drop(keyboard);
        drop(mouse);
        assert_eq!(releases(&mock), 2);
    }

    /// Every registered product survives the save→load round trip for every mode.
    #[test]
    fn all_products_roundtrip_every_mode() {
        let temp_dir = TempDir::new().unwrap();
        let modes = [
            LightingMode::Static { color: 0x123456 },
            LightingMode::Breathe {
                color: 0x654321,
                speed_ms: 500,
            },
            LightingMode::Cycle { speed_ms: 65_535 },
            LightingMode::Segments {
                colors: [1, 2, 3, 4, 5],
            },
        ];
        for profile in product::all() {
            for mode in &modes {
                let path = temp_dir
                    .path()
                    .join(format!("{}-{}.conf", profile.name, mode.label()));
                let commands = encoder::encode_mode(profile, mode).unwrap();
                store::save(profile.name, &commands, &path).unwrap();
                let loaded = store::load(&path).unwrap();
                assert_eq!(loaded.product, profile.name);
                assert_eq!(loaded.commands, commands);
            }
        }
    }
}
