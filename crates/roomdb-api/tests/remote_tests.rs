mod common;

use common::{named_room, room, DataTestFixture};
use roomdb::{Error, RemoteClient, RemoteServer, RoomDatabase, RoomField};
use std::sync::Arc;
use std::thread;

#[test]
fn test_remote_client_against_file_database() {
    let fixture = DataTestFixture::new();
    let data = Arc::new(fixture.create_data(4));
    let server = RemoteServer::bind("127.0.0.1:0", Arc::clone(&data))
        .unwrap()
        .spawn()
        .unwrap();

    let client = RemoteClient::connect(server.local_addr()).unwrap();

    assert_eq!(client.read(3).unwrap(), room(3));
    assert!(matches!(
        client.read(999_999),
        Err(Error::RecordNotFound { position: 999_999 })
    ));

    client.delete(2).unwrap();
    assert_eq!(client.create(named_room("Lodge", "Whoville")).unwrap(), 2);

    client.book(2, "12345678").unwrap();
    assert_eq!(data.read(2).unwrap().get(RoomField::Owner), "12345678");

    let whoville = client.find(None, Some("Who")).unwrap();
    assert_eq!(whoville.len(), 1);
    assert_eq!(whoville[0].0, 2);

    server.shutdown().unwrap();
}

#[test]
fn test_remote_duplicate_race() {
    let fixture = DataTestFixture::new();
    let data = Arc::new(fixture.create_data(0));
    let server = RemoteServer::bind("127.0.0.1:0", data).unwrap().spawn().unwrap();
    let addr = server.local_addr();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(move || {
                let client = RemoteClient::connect(addr).unwrap();
                client.create(named_room("Palace", "Smallville"))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, Error::DuplicateKey { .. })));
}
