mod common;

use common::{check_invariants, fresh_fs};
use skriva::fs::Filesystem;

fn pattern(n: u32) -> Vec<u8> {
    (0..4096u32).map(|i| (n.wrapping_add(i)) as u8).collect()
}

#[test]
fn collection_is_a_noop_on_a_fresh_image() {
    let mut fs = fresh_fs();
    let tail = fs.log_tail();
    fs.collect().unwrap();
    assert_eq!(fs.log_tail(), tail);
    assert_eq!(fs.read("/hello.txt", 0, 64).unwrap(), b"Hello from LFS!\n");
}

#[test]
fn overwriting_until_low_space_triggers_collection() {
    let mut fs = fresh_fs();
    fs.create("/a").unwrap();

    let mut n = 0;
    while !fs.gc_should_run() {
        fs.write("/a", 0, &pattern(n)).unwrap();
        n += 1;
    }

    // The next write must collect before appending.
    let tail_before = fs.log_tail();
    let last = pattern(n);
    fs.write("/a", 0, &last).unwrap();

    assert!(fs.log_tail() < tail_before, "the log tail must rewind");
    assert_eq!(fs.read("/a", 0, 4096).unwrap(), last);
    assert_eq!(fs.read("/hello.txt", 0, 64).unwrap(), b"Hello from LFS!\n");
    check_invariants(&fs);
}

#[test]
fn collection_preserves_every_file() {
    let mut fs = fresh_fs();
    fs.create("/a").unwrap();
    fs.create("/b").unwrap();
    let a: Vec<u8> = (0..3 * 4096u32).map(|i| i as u8).collect();
    let b: Vec<u8> = (0..4096u32).map(|i| (i * 7) as u8).collect();
    fs.write("/a", 0, &a).unwrap();
    fs.write("/b", 4096, &b).unwrap();
    // Obsolete a few versions so the collector has work to do.
    for n in 0..20 {
        fs.write("/a", 0, &pattern(n)).unwrap();
    }
    fs.write("/a", 0, &a[..4096]).unwrap();

    fs.collect().unwrap();

    assert_eq!(fs.read("/a", 0, a.len()).unwrap(), a);
    let got_b = fs.read("/b", 0, 2 * 4096).unwrap();
    assert!(got_b[..4096].iter().all(|&x| x == 0));
    assert_eq!(&got_b[4096..], b);
    assert_eq!(fs.read("/hello.txt", 0, 64).unwrap(), b"Hello from LFS!\n");
    check_invariants(&fs);
}

#[test]
fn collection_reclaims_truncated_blocks() {
    let mut fs = fresh_fs();
    fs.create("/a").unwrap();
    // Several full rewrites leave plenty of dead blocks behind.
    for n in 0..5 {
        let data = vec![n as u8; 10 * 4096];
        fs.write("/a", 0, &data).unwrap();
    }
    fs.truncate("/a", 0).unwrap();

    let tail_before = fs.log_tail();
    fs.collect().unwrap();
    assert!(fs.log_tail() < tail_before);
    assert!(fs.read("/a", 0, 16).unwrap().is_empty());
    check_invariants(&fs);
}

#[test]
fn collected_state_survives_a_remount() {
    let mut fs = fresh_fs();
    fs.create("/a").unwrap();
    for n in 0..30 {
        fs.write("/a", 0, &pattern(n)).unwrap();
    }
    let last = pattern(29);
    fs.collect().unwrap();

    let storage = fs.unmount().unwrap();
    let fs = Filesystem::mount(storage).unwrap();
    assert_eq!(fs.read("/a", 0, 4096).unwrap(), last);
    assert_eq!(fs.read("/hello.txt", 0, 64).unwrap(), b"Hello from LFS!\n");
    check_invariants(&fs);
}
