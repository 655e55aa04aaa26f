use spoolq::{Error, Queue, CHUNK_HEADER_SIZE, ENTRY_HEADER_SIZE};
use tempfile::tempdir;

#[test]
fn second_payload_rolls_into_a_new_chunk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("q");

    let payload = [1u8, 2, 3];
    // fits the chunk header, one entry header, and two same-size payloads,
    // so the second entry's own header pushes it over the edge
    let chunk_size = (CHUNK_HEADER_SIZE + ENTRY_HEADER_SIZE + 2 * payload.len()) as u64;

    let mut queue = Queue::open(&path, chunk_size).expect("queue open");
    assert!(queue.is_empty());
    assert_eq!(queue.chunk_count(), 0);

    queue.enqueue(&payload).expect("first enqueue");
    assert!(!queue.is_empty());
    assert_eq!(queue.chunk_count(), 1);

    queue.enqueue(&payload).expect("second enqueue");
    assert_eq!(queue.chunk_count(), 2);
    assert!(path.with_file_name("q.1").exists());
    assert!(path.with_file_name("q.2").exists());

    assert!(queue.dequeue().expect("dequeue"));
    assert!(!queue.is_empty());
    assert_eq!(queue.chunk_count(), 1);
    assert!(!path.with_file_name("q.1").exists());

    assert!(queue.clear().expect("clear"));
    assert!(queue.is_empty());
    assert!(!queue.clear().expect("clear when empty"));

    queue.close().expect("close");
}

#[test]
fn max_element_fits_and_one_more_byte_does_not() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("q");

    let mut queue = Queue::open(&path, 1024).expect("queue open");
    let max = queue.max_element_size() as usize;
    assert_eq!(max, 1024 - CHUNK_HEADER_SIZE - ENTRY_HEADER_SIZE);

    let err = queue.enqueue(&vec![0u8; max + 1]).expect_err("oversized payload");
    assert!(matches!(err, Error::PayloadTooLarge));
    assert!(queue.is_empty());

    queue.enqueue(&vec![7u8; max]).expect("max payload");
    assert_eq!(queue.peek().expect("peek").map(|p| p.len()), Some(max));

    assert!(queue.dequeue().expect("dequeue"));
    queue.close().expect("close");
}

#[test]
fn drained_sole_chunk_is_reused_in_place() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("q");

    let mut queue = Queue::open(&path, 64).expect("queue open");
    queue.enqueue(b"one").expect("enqueue");
    assert!(queue.dequeue().expect("dequeue"));
    assert!(queue.is_empty());

    // the chunk file sticks around and takes the next entry from the start
    assert!(path.with_file_name("q.1").exists());
    queue.enqueue(b"two").expect("enqueue after drain");
    assert_eq!(queue.chunk_count(), 1);
    assert_eq!(queue.peek().expect("peek"), Some(b"two".to_vec()));

    assert!(queue.dequeue().expect("dequeue"));
    queue.close().expect("close");
    assert!(!path.with_file_name("q.1").exists());
}
