use proptest::prelude::*;

use crate::block::BLOCK_SIZE;
use crate::fs::Filesystem;
use crate::fs::inode::MAX_FILE_SIZE;
use crate::fs::superblock::LOG_START;
use crate::storage::MemStorage;

#[derive(Debug, Clone)]
enum Action {
    Write { offset: u32, data: Vec<u8> },
    Truncate,
    Collect,
}

fn arb_action() -> impl Strategy<Value = Action> {
    let arb_write = (
        0..MAX_FILE_SIZE,
        prop::collection::vec(any::<u8>(), 1..=2 * BLOCK_SIZE),
    )
        .prop_map(|(offset, data)| Action::Write { offset, data });
    prop_oneof![
        6 => arb_write,
        1 => Just(Action::Truncate),
        1 => Just(Action::Collect),
    ]
}

fn check_invariants(fs: &Filesystem<MemStorage>) -> Result<(), TestCaseError> {
    let total = fs.superblock().total_blocks.get();
    let tail = fs.log_tail();
    prop_assert!(tail <= total);
    for (ino, addr) in fs.inode_map().entries() {
        prop_assert!((LOG_START..tail).contains(&addr));
        let inode = fs.inode_read(ino).unwrap();
        prop_assert_eq!(inode.inode_no.get(), ino);
        for direct in inode.direct {
            let direct = direct.get();
            if direct != 0 {
                prop_assert!((LOG_START..tail).contains(&direct));
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn operations_match_a_flat_model(actions in prop::collection::vec(arb_action(), 1..24)) {
        let mut fs = Filesystem::format(MemStorage::new(1024)).unwrap();
        fs.create("/file").unwrap();
        let mut model = vec![0u8; MAX_FILE_SIZE as usize];
        let mut model_len = 0usize;

        for action in actions {
            match action {
                Action::Write { offset, data } => {
                    let written = fs.write("/file", u64::from(offset), &data).unwrap();
                    let expected = data.len().min(MAX_FILE_SIZE as usize - offset as usize);
                    prop_assert_eq!(written, expected);
                    let offset = offset as usize;
                    model[offset..offset + written].copy_from_slice(&data[..written]);
                    model_len = model_len.max(offset + written);
                }
                Action::Truncate => {
                    fs.truncate("/file", 0).unwrap();
                    model.fill(0);
                    model_len = 0;
                }
                Action::Collect => fs.collect().unwrap(),
            }
            check_invariants(&fs)?;
            let got = fs.read("/file", 0, model_len).unwrap();
            prop_assert_eq!(&got[..], &model[..model_len]);
        }
    }

    #[test]
    fn collection_preserves_observable_content(
        data in prop::collection::vec(any::<u8>(), 1..=3 * BLOCK_SIZE),
        offset in 0u32..(MAX_FILE_SIZE - 3 * BLOCK_SIZE as u32),
    ) {
        let mut fs = Filesystem::format(MemStorage::new(1024)).unwrap();
        fs.create("/file").unwrap();
        fs.write("/file", u64::from(offset), &data).unwrap();
        let before = fs.read("/file", 0, MAX_FILE_SIZE as usize).unwrap();
        let hello_before = fs.read("/hello.txt", 0, 64).unwrap();

        fs.collect().unwrap();

        prop_assert_eq!(fs.read("/file", 0, MAX_FILE_SIZE as usize).unwrap(), before);
        prop_assert_eq!(fs.read("/hello.txt", 0, 64).unwrap(), hello_before);
        check_invariants(&fs)?;
    }
}
