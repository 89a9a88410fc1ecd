//! Drives the `Filesystem` trait implementation through an actual kernel
//! FUSE mount (the pack's own testing idiom for FUSE drivers — see e.g.
//! `examples/cberner-fuser/tests/integration_tests.rs`), rather than
//! constructing `fuser::Request` values by hand, which the crate does not
//! expose a public constructor for.

#![cfg(target_os = "linux")]

use std::ffi::OsString;
use std::fs;
use std::sync::{Arc, Mutex};

use fuser::MountOption;
use netfuse::client::Client;
use netfuse::config::Config;
use netfuse::fs::{FsWrapper, RemoteFS};
use netfuse_testserver::TestServer;

fn test_config() -> Config {
    Config {
        host: String::new(),
        port: 0,
        psk: String::new(),
        uid: unsafe { libc::getuid() },
        gid: unsafe { libc::getgid() },
        debug: false,
        cache_enabled: true,
        kernel_attr_timeout_seconds: 0,
        kernel_entry_timeout_seconds: 0,
    }
}

#[test]
fn mount_supports_create_write_read_list_rename_and_remove() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(TestServer::spawn("")).unwrap();
    let client = runtime.block_on(Client::connect(&server.host(), server.port(), "", true)).unwrap();

    let mountpoint = tempfile::tempdir().unwrap();
    let remote_fs = RemoteFS::new(client, runtime, test_config());
    let wrapper = FsWrapper(Arc::new(Mutex::new(remote_fs)));

    let options = vec![MountOption::AutoUnmount, MountOption::FSName("netfuse-test".to_string())];
    let _session = match fuser::spawn_mount2(wrapper, mountpoint.path(), &options) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("skipping: could not mount FUSE filesystem ({e}); /dev/fuse unavailable?");
            return;
        }
    };

    let file_path = mountpoint.path().join("a.txt");
    fs::write(&file_path, b"hello").unwrap();
    assert_eq!(fs::read(&file_path).unwrap(), b"hello");

    let entries: Vec<OsString> = fs::read_dir(mountpoint.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(entries.contains(&OsString::from("a.txt")));

    let sub = mountpoint.path().join("sub");
    fs::create_dir(&sub).unwrap();
    let renamed = sub.join("b.txt");
    fs::rename(&file_path, &renamed).unwrap();
    assert!(!file_path.exists());
    assert_eq!(fs::read(&renamed).unwrap(), b"hello");

    fs::remove_file(&renamed).unwrap();
    fs::remove_dir(&sub).unwrap();
    assert!(!renamed.exists());
}
