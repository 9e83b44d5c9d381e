// Client/server integration tests

mod common;

use common::{room, MemoryDatabase, RemoteTestFixture, SlowDatabase};
use roomdb_core::{Error, ErrorKind, Record, RoomDatabase, RoomField};
use roomdb_remote::{Frame, FrameKind, RemoteClient, RemoteServer, Request, Response};
use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_remote_round_trip() {
    let fixture = RemoteTestFixture::new(3);
    let client = fixture.client();

    assert_eq!(client.read(1).unwrap(), room(1));

    let position = client.create(room(10)).unwrap();
    assert_eq!(position, 3);
    assert_eq!(fixture.db.read(3).unwrap(), room(10));

    let updated = room(10).with_field(RoomField::Rate.index(), "$99.00");
    client.update(position, updated.clone()).unwrap();
    assert_eq!(client.read(position).unwrap(), updated);

    client.delete(position).unwrap();
    assert!(matches!(
        client.read(position),
        Err(Error::RecordNotFound { position: 3 })
    ));
}

#[test]
fn test_remote_errors_keep_their_kind() {
    let fixture = RemoteTestFixture::new(2);
    let client = fixture.client();

    let err = client.create(room(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert!(err.to_string().contains("Hotel 0"));

    client.delete(0).unwrap();
    // A repeated delete is rejected, not silently accepted
    assert!(matches!(
        client.delete(0),
        Err(Error::RecordNotFound { position: 0 })
    ));

    client.book(1, "12345678").unwrap();
    assert!(matches!(
        client.book(1, "87654321"),
        Err(Error::AlreadyBooked { position: 1 })
    ));
}

#[test]
fn test_remote_find() {
    let fixture = RemoteTestFixture::new(0);
    let client = fixture.client();

    for (name, location) in [("Lodge", "Smallville"), ("Lounge", "Xanadu"), ("Motel", "Smallville")] {
        let record = Record::room(name, location, "2", "Y", "$80.00", "2005/07/27", "");
        client.create(record).unwrap();
    }

    let names: Vec<String> = client
        .find(Some("Lo"), Some(""))
        .unwrap()
        .into_iter()
        .map(|(_, r)| r.get(RoomField::Name).to_string())
        .collect();
    assert_eq!(names, vec!["Lodge", "Lounge"]);

    assert_eq!(client.find(None, None).unwrap().len(), 3);
    assert_eq!(client.find(None, Some("Small")).unwrap().len(), 2);
}

#[test]
fn test_many_clients_in_parallel() {
    let fixture = RemoteTestFixture::new(0);
    let addr = fixture.handle.local_addr();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let client = RemoteClient::connect(addr).unwrap();
                client.create(room(100 + i)).unwrap()
            })
        })
        .collect();

    let mut positions: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    positions.sort_unstable();
    assert_eq!(positions, (0..8).collect::<Vec<u64>>());
}

#[test]
fn test_shared_client_serializes_calls() {
    let fixture = RemoteTestFixture::new(4);
    let client = Arc::new(fixture.client());

    let handles: Vec<_> = (0..4u64)
        .map(|position| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for _ in 0..20 {
                    assert_eq!(client.read(position).unwrap(), room(position as usize));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_malformed_payload_gets_error_response() {
    let fixture = RemoteTestFixture::new(1);
    let mut stream = TcpStream::connect(fixture.handle.local_addr()).unwrap();

    let bogus = Frame {
        kind: FrameKind::Request,
        payload: vec![0xFF; 3],
    };
    bogus.write_to(&mut stream).unwrap();

    let frame = Frame::read_from(&mut stream).unwrap().unwrap();
    let response: Response = frame.into_message(FrameKind::Response).unwrap();
    assert!(matches!(response, Response::Failed(ref e) if e.kind == ErrorKind::Serialization));

    // The connection stays usable afterwards
    Frame::from_message(FrameKind::Request, &Request::Read(0))
        .unwrap()
        .write_to(&mut stream)
        .unwrap();
    let frame = Frame::read_from(&mut stream).unwrap().unwrap();
    let response: Response = frame.into_message(FrameKind::Response).unwrap();
    assert_eq!(response, Response::Record(room(0)));
}

#[test]
fn test_corrupt_frame_closes_connection() {
    let fixture = RemoteTestFixture::new(1);
    let mut stream = TcpStream::connect(fixture.handle.local_addr()).unwrap();

    let mut encoded = Frame::from_message(FrameKind::Request, &Request::Read(0))
        .unwrap()
        .encode()
        .unwrap();
    let last = encoded.len() - 1;
    encoded[last] ^= 0xFF;
    stream.write_all(&encoded).unwrap();

    assert_eq!(Frame::read_from(&mut stream).unwrap(), None);
}

#[test]
fn test_shutdown_stops_accepting() {
    let fixture = RemoteTestFixture::new(1);
    let addr = fixture.handle.local_addr();
    let client = fixture.client();

    fixture.handle.shutdown().unwrap();

    // Accepted connections keep working
    assert_eq!(client.read(0).unwrap(), room(0));
    assert!(RemoteClient::connect(addr).is_err());
}

#[test]
fn test_timed_out_call_never_yields_a_late_response() {
    let db = Arc::new(SlowDatabase {
        inner: MemoryDatabase::with_rooms(2),
        slow_position: 0,
        delay: Duration::from_millis(300),
    });
    let handle = RemoteServer::bind("127.0.0.1:0", db)
        .unwrap()
        .spawn()
        .unwrap();

    let client = RemoteClient::connect(handle.local_addr()).unwrap();
    client.set_timeout(Some(Duration::from_millis(50))).unwrap();

    assert_eq!(client.read(0).unwrap_err().kind(), ErrorKind::Io);
    assert!(client.is_broken());

    // Give the server time to write the answer to the abandoned call
    thread::sleep(Duration::from_millis(500));

    let err = client.read(1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(matches!(client.delete(1), Err(Error::Protocol(_))));

    // A fresh connection sees the real state
    let fresh = RemoteClient::connect(handle.local_addr()).unwrap();
    assert_eq!(fresh.read(1).unwrap(), room(1));
}

#[test]
fn test_domain_failure_keeps_connection() {
    let fixture = RemoteTestFixture::new(1);
    let client = fixture.client();

    assert!(matches!(
        client.read(5),
        Err(Error::RecordNotFound { position: 5 })
    ));
    assert!(!client.is_broken());
    assert_eq!(client.read(0).unwrap(), room(0));
}
