//! Concurrency tests
//!
//! Many tasks share one transfer session through cloned `RemoteFs` values.
//! Each task stats, opens, seeks and reads its own file and checks that
//! no cursor or metadata leaks between handles.

use std::io::SeekFrom;
use std::sync::Arc;

use sshdav_core::{MemoryTransfer, OpenFlags, RemoteFs};
use tokio::task::JoinSet;

const FILES: usize = 16;
const ROUNDS: usize = 8;

fn content_for(i: usize) -> Vec<u8> {
    format!("file-{i:02}:").repeat(64 + i).into_bytes()
}

fn make_fs() -> RemoteFs {
    let mem = Arc::new(MemoryTransfer::new());
    for i in 0..FILES {
        mem.add_file(&format!("/srv/data/f{i:02}.bin"), &content_for(i));
    }
    RemoteFs::new(mem, "/srv/data")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stat_open_read() {
    let fs = make_fs();
    let mut tasks = JoinSet::new();

    for round in 0..ROUNDS {
        for i in 0..FILES {
            let fs = fs.clone();
            tasks.spawn(async move {
                let name = format!("/f{i:02}.bin");
                let expected = content_for(i);

                let info = fs.stat(&name).await.unwrap();
                assert_eq!(info.size, expected.len() as u64);

                let mut file = fs.open_file(&name, OpenFlags::read_only()).await;
                assert!(file.is_live());

                // start at a round-dependent offset so handles disagree on position
                let offset = (round * 7) as u64;
                assert_eq!(file.seek(SeekFrom::Start(offset)).await.unwrap(), offset);

                let mut data = Vec::new();
                let mut buf = [0u8; 37];
                loop {
                    let n = file.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    data.extend_from_slice(&buf[..n]);
                    tokio::task::yield_now().await;
                }
                assert_eq!(data, expected[offset as usize..]);
                file.close().await.unwrap();
            });
        }
    }

    let mut completed = 0;
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
        completed += 1;
    }
    assert_eq!(completed, FILES * ROUNDS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_listing_and_missing_paths() {
    let fs = make_fs();
    let mut tasks = JoinSet::new();

    for i in 0..32 {
        let fs = fs.clone();
        tasks.spawn(async move {
            if i % 2 == 0 {
                let mut dir = fs.open_file("/", OpenFlags::read_only()).await;
                assert_eq!(dir.readdir(0).await.unwrap().len(), FILES);
            } else {
                let mut missing = fs
                    .open_file(&format!("/nope-{i}"), OpenFlags::read_only())
                    .await;
                assert!(missing.stat().await.unwrap_err().is_not_found());
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }
}
