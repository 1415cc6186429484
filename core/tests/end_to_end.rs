//! End-to-end scenarios spanning the MMR, signer, secure event store,
//! context manager, and correlator together, rather than one module at a
//! time. Each test name matches the concrete scenario it covers.

use tempfile::TempDir;
use witnessd_core::context::{ContextManager, ContextType};
use witnessd_core::correlator::{self, Input, Status};
use witnessd_core::hash;
use witnessd_core::mmr::{MmrEngine, MmrStore};
use witnessd_core::sigchain::{Entry, SignatureLog};
use witnessd_core::signer::Signer;
use witnessd_core::store::{EventFields, IntegrityStatus, SecureEventStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn open_mmr(dir: &TempDir) -> MmrEngine {
    MmrEngine::open(MmrStore::open(dir.path().join("mmr.dat")).unwrap()).unwrap()
}

#[test]
fn witness_and_verify() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mut mmr = open_mmr(&dir);
    let signer = Signer::from_raw_seed(&[1u8; 32]);

    let (leaf_index, mmr_size, root) = mmr.append_leaf(b"hello").unwrap();
    assert_eq!(leaf_index, 0);
    assert_eq!(mmr_size, 1);
    assert_eq!(root, hash::leaf_hash(b"hello"));

    let mut sig_log = SignatureLog::open(dir.path().join("signatures.log")).unwrap();
    let signature = signer.sign_root(&root);
    sig_log
        .append(Entry { timestamp: chrono::Utc::now(), root, signature, size: mmr.size() })
        .unwrap();

    let pub_key = signer.public_key();
    let ok = witnessd_core::evidence::verify(b"hello", &pub_key, &mut mmr, &sig_log).unwrap();
    assert!(ok.valid, "{:?}", ok.error);

    let tampered = witnessd_core::evidence::verify(b"hello!", &pub_key, &mut mmr, &sig_log).unwrap();
    assert!(!tampered.valid);
    assert_eq!(tampered.error.as_deref(), Some("not_witnessed"));
}

#[test]
fn witness_stays_valid_after_the_mmr_keeps_growing() {
    let dir = TempDir::new().unwrap();
    let mut mmr = open_mmr(&dir);
    let signer = Signer::from_raw_seed(&[2u8; 32]);
    let mut sig_log = SignatureLog::open(dir.path().join("signatures.log")).unwrap();

    let (_, size, root) = mmr.append_leaf(b"first").unwrap();
    let signature = signer.sign_root(&root);
    sig_log
        .append(Entry { timestamp: chrono::Utc::now(), root, signature, size })
        .unwrap();

    // A daemon that keeps witnessing files after each periodic sign: these
    // appends must not invalidate the proof for the already-signed file.
    mmr.append_leaf(b"second").unwrap();
    mmr.append_leaf(b"third").unwrap();

    let pub_key = signer.public_key();
    let packet = witnessd_core::evidence::export("first.txt", b"first", &mut mmr, &sig_log, pub_key).unwrap();
    assert_eq!(packet.mmr_root, root);
    assert_eq!(packet.mmr_size, size);

    let result = witnessd_core::evidence::verify(b"first", &pub_key, &mut mmr, &sig_log).unwrap();
    assert!(result.valid, "{:?}", result.error);
}

#[test]
fn two_leaf_commitment() {
    let dir = TempDir::new().unwrap();
    let mut mmr = open_mmr(&dir);

    mmr.append_leaf(b"a").unwrap();
    let (leaf_index, mmr_size, root) = mmr.append_leaf(b"b").unwrap();
    assert_eq!(leaf_index, 1);
    assert_eq!(mmr_size, 3);

    let expected_root = hash::node_hash(&hash::leaf_hash(b"a"), &hash::leaf_hash(b"b"));
    assert_eq!(root, expected_root);

    let proof = mmr.prove(0).unwrap();
    assert_eq!(proof.path.len(), 1);
    assert_eq!(proof.path[0].hash, hash::leaf_hash(b"b"));
    assert!(proof.verify(&root));
}

#[test]
fn three_leaf_shape() {
    let dir = TempDir::new().unwrap();
    let mut mmr = open_mmr(&dir);

    mmr.append_leaf(b"a").unwrap();
    mmr.append_leaf(b"b").unwrap();
    let (_, _, root) = mmr.append_leaf(b"c").unwrap();

    let p2 = hash::node_hash(&hash::leaf_hash(b"a"), &hash::leaf_hash(b"b"));
    let p3 = hash::leaf_hash(b"c");
    assert_eq!(root, hash::node_hash(&p2, &p3));

    for i in 0..3u64 {
        let proof = mmr.prove(i).unwrap();
        assert!(proof.verify(&root));
    }
}

#[test]
fn tamper_detection_stops_at_first_bad_row() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("events.db");
    {
        let mut store = SecureEventStore::open(&db_path, b"integration-seed").unwrap();
        for i in 0..3i64 {
            store
                .append(
                    EventFields {
                        timestamp_ns: i,
                        file_path: "doc.txt".into(),
                        file_size: 10 + i,
                        size_delta: 1,
                        content_hash: hash::leaf_hash(format!("rev{i}").as_bytes()),
                        context_id: None,
                    },
                    &[],
                )
                .unwrap();
        }
        assert_eq!(store.integrity_check().unwrap(), IntegrityStatus::Ok);
    }

    // Flip `size_delta` on event 2 out-of-band; event 1 must still verify.
    let raw = rusqlite::Connection::open(&db_path).unwrap();
    raw.execute("UPDATE events SET size_delta = 999 WHERE id = 2", []).unwrap();
    drop(raw);

    let store = SecureEventStore::open(&db_path, b"integration-seed").unwrap();
    match store.integrity_check().unwrap() {
        IntegrityStatus::TamperDetected { first_bad_id } => assert_eq!(first_bad_id, 2),
        IntegrityStatus::Ok => panic!("tampering must be detected"),
    }
}

#[test]
fn context_exclusivity() {
    let mut contexts = ContextManager::open(":memory:").unwrap();
    contexts.begin(ContextType::External, "note", 0).unwrap();
    assert!(contexts.begin(ContextType::Assisted, "note", 1).is_err());
    contexts.end(2).unwrap();
    assert!(contexts.end(3).is_err());
}

#[test]
fn correlator_excess() {
    let report = correlator::correlate(Input {
        document_length: 2000.0,
        total_keystrokes: 1000.0,
        detected_paste_chars: 0.0,
        autocomplete_chars: 0.0,
        suspicious_bursts: 0,
        edit_ratio: None,
    });
    assert_eq!(report.status, Status::Inconsistent);
    assert!((report.ratio.unwrap() - 1.3529411764705883).abs() < 1e-9);
}
