use spoolq::Queue;
use tempfile::tempdir;

#[test]
fn dequeue_changes_the_head_file_on_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("q");

    {
        let mut queue = Queue::open(&path, 1024).expect("queue open");
        let max = queue.max_element_size() as usize;
        queue.enqueue(&vec![b'x'; max]).expect("first enqueue");
        queue.enqueue(&vec![b'y'; max]).expect("second enqueue");
        queue.close().expect("close");
    }

    let before = std::fs::read(&path).expect("head bytes before");

    {
        let mut queue = Queue::open(&path, 1024).expect("reopen");
        assert!(queue.dequeue().expect("dequeue"));
        queue.close().expect("close");
    }

    let after = std::fs::read(&path).expect("head bytes after");
    assert_ne!(before, after);

    let mut queue = Queue::open(&path, 1024).expect("final open");
    assert!(queue.clear().expect("clear"));
    queue.close().expect("close");
}
