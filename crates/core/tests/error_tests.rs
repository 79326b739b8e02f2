// ═══════════════════════════════════════════════════════════════════
// Error Tests: CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use tradeledger_core::errors::CoreError;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn invalid_file_format() {
        let err = CoreError::InvalidFileFormat("bad header".into());
        assert_eq!(err.to_string(), "Invalid file format: bad header");
    }

    #[test]
    fn unsupported_version() {
        let err = CoreError::UnsupportedVersion(99);
        assert_eq!(err.to_string(), "Unsupported file version: 99");
    }

    #[test]
    fn unsupported_version_max() {
        let err = CoreError::UnsupportedVersion(u16::MAX);
        assert_eq!(
            err.to_string(),
            format!("Unsupported file version: {}", u16::MAX)
        );
    }

    #[test]
    fn encryption() {
        let err = CoreError::Encryption("AES key size invalid".into());
        assert_eq!(err.to_string(), "Encryption failed: AES key size invalid");
    }

    #[test]
    fn decryption() {
        let err = CoreError::Decryption;
        assert_eq!(
            err.to_string(),
            "Decryption failed — wrong password or corrupted file"
        );
    }

    #[test]
    fn serialization() {
        let err = CoreError::Serialization("sequence too long".into());
        assert_eq!(err.to_string(), "Serialization error: sequence too long");
    }

    #[test]
    fn deserialization() {
        let err = CoreError::Deserialization("unexpected EOF".into());
        assert_eq!(err.to_string(), "Deserialization error: unexpected EOF");
    }

    #[test]
    fn file_io() {
        let err = CoreError::FileIO("disk full".into());
        assert_eq!(err.to_string(), "File I/O error: disk full");
    }

    #[test]
    fn api_error() {
        let err = CoreError::Api {
            provider: "Frankfurter".into(),
            message: "HTTP 503".into(),
        };
        assert_eq!(err.to_string(), "API error (Frankfurter): HTTP 503");
    }

    #[test]
    fn network() {
        let err = CoreError::Network("connection refused".into());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn rate_source_unavailable() {
        let err = CoreError::RateSourceUnavailable("no rate providers registered".into());
        assert_eq!(
            err.to_string(),
            "No rate source available: no rate providers registered"
        );
    }

    #[test]
    fn missing_rate() {
        let err = CoreError::MissingRate {
            currency: "GBP".into(),
            canonical: "USD".into(),
        };
        assert_eq!(err.to_string(), "No usable rate for GBP against canonical USD");
    }

    #[test]
    fn validation_error() {
        let err = CoreError::ValidationError("Item name must not be empty".into());
        assert_eq!(
            err.to_string(),
            "Validation failed: Item name must not be empty"
        );
    }

    #[test]
    fn transaction_not_found() {
        let err = CoreError::TransactionNotFound("t-42".into());
        assert_eq!(err.to_string(), "Transaction not found: t-42");
    }

    #[test]
    fn invalid_import_record() {
        let err = CoreError::InvalidImportRecord {
            index: 3,
            reason: "missing date".into(),
        };
        assert_eq!(err.to_string(), "Import record #3 rejected: missing date");
    }

    #[test]
    fn session_unavailable() {
        let err = CoreError::SessionUnavailable("alice".into());
        assert_eq!(
            err.to_string(),
            "Session state unavailable for user 'alice'"
        );
    }
}

// ── From impls ──────────────────────────────────────────────────────

mod from_impls {
    use super::*;

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CoreError = io_err.into();
        match err {
            CoreError::FileIO(msg) => assert!(msg.contains("file not found")),
            other => panic!("Expected FileIO, got {other:?}"),
        }
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn from_csv_error() {
        let mut reader = csv::Reader::from_reader("a,b\n1,2,3\n".as_bytes());
        let csv_err = reader
            .records()
            .find_map(Result::err)
            .expect("ragged row should fail");
        let err: CoreError = csv_err.into();
        match err {
            CoreError::Deserialization(msg) => assert!(msg.starts_with("CSV: ")),
            other => panic!("Expected Deserialization, got {other:?}"),
        }
    }

    #[test]
    fn from_aes_gcm_error_via_open() {
        use tradeledger_core::storage::encryption::{KdfParams, SealingKey};

        let salt = [3u8; 16];
        let nonce = [1u8; 12];
        let right = SealingKey::derive("right", &salt, &KdfParams::minimal()).unwrap();
        let sealed = right.seal(&nonce, b"header", b"ledger").unwrap();

        let wrong = SealingKey::derive("wrong", &salt, &KdfParams::minimal()).unwrap();
        assert!(matches!(
            wrong.open(&nonce, b"header", &sealed),
            Err(CoreError::Decryption)
        ));
    }
}

// ── std::error::Error ───────────────────────────────────────────────

mod std_error {
    use super::*;

    #[test]
    fn core_error_implements_error_trait() {
        let err: Box<dyn std::error::Error> = Box::new(CoreError::Decryption);
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn core_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CoreError>();
    }

    #[test]
    fn question_mark_converts_io_errors() {
        fn read_missing() -> Result<Vec<u8>, CoreError> {
            Ok(std::fs::read("/definitely/not/here.tlgr")?)
        }
        assert!(matches!(read_missing(), Err(CoreError::FileIO(_))));
    }
}
