//! Integration tests for betwire-client.
//!
//! A scripted aggregator runs on the far end of in-memory duplex streams
//! (one per expected connection) and the session controller drives the
//! real protocol against it.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{duplex, DuplexStream};
use tokio_util::sync::CancellationToken;

use betwire_client::protocol::FrameTransport;
use betwire_client::{
    Bet, BetwireError, Client, Connect, RecordSource, Result, SessionOutcome,
};

/// Hands out pre-arranged streams, one per `connect` call.
struct QueueConnector {
    streams: VecDeque<DuplexStream>,
}

impl QueueConnector {
    fn new(streams: Vec<DuplexStream>) -> Self {
        Self {
            streams: streams.into(),
        }
    }
}

#[async_trait]
impl Connect for QueueConnector {
    type Stream = DuplexStream;

    async fn connect(&mut self) -> Result<Self::Stream> {
        self.streams.pop_front().ok_or_else(|| {
            BetwireError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no scripted connection left",
            ))
        })
    }
}

/// In-memory record source.
struct VecSource(VecDeque<Bet>);

impl VecSource {
    fn new(bets: Vec<Bet>) -> Self {
        Self(bets.into())
    }
}

impl RecordSource for VecSource {
    fn next(&mut self) -> Result<Option<Bet>> {
        Ok(self.0.pop_front())
    }
}

fn bets(n: usize) -> Vec<Bet> {
    (0..n)
        .map(|i| Bet {
            agency_id: "7".to_string(),
            first_name: format!("First{}", i),
            last_name: format!("Last{}", i),
            national_id: format!("3000000{}", i),
            birth_date: "1999-03-17".to_string(),
            number: format!("{}", 1000 + i),
        })
        .collect()
}

fn serialized(bets: &[Bet]) -> String {
    bets.iter().map(Bet::serialize).collect()
}

#[tokio::test]
async fn test_session_delivers_every_record_and_reports_winners() {
    let (batch_near, batch_far) = duplex(64 * 1024);
    let (poll_near, poll_far) = duplex(4096);

    let server = tokio::spawn(async move {
        let mut transport = FrameTransport::new(batch_far);
        let mut batches = Vec::new();
        loop {
            let text = transport.recv_text().await.unwrap();
            if text == "exit" {
                break;
            }
            batches.push(text);
            transport.send(b"success").await.unwrap();
        }

        let mut transport = FrameTransport::new(poll_far);
        let request = transport.recv_text().await.unwrap();
        assert_eq!(request, "winners;7");
        transport
            .send(br#"["30000001", "30000004"]"#)
            .await
            .unwrap();

        batches
    });

    let input = bets(6);
    let expected = serialized(&input);

    let mut client = Client::<QueueConnector>::builder("7")
        .max_batch_bytes(96)
        .build(QueueConnector::new(vec![batch_near, poll_near]));
    let outcome = client.run(VecSource::new(input)).await.unwrap();

    let batches = server.await.unwrap();
    assert!(batches.len() > 1, "96-byte batches must split 6 records");
    assert_eq!(batches.concat(), expected);

    match outcome {
        SessionOutcome::Done(report) => {
            assert_eq!(report.records_accepted, 6);
            assert_eq!(report.records_rejected, 0);
            assert_eq!(report.batches_sent as usize, batches.len());
            assert_eq!(report.winners, vec!["30000001", "30000004"]);
        }
        other => panic!("expected Done, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fatal_ack_aborts_the_session() {
    let (near, far) = duplex(4096);

    let server = tokio::spawn(async move {
        let mut transport = FrameTransport::new(far);
        let _ = transport.recv().await.unwrap();
        transport.send(b"error").await.unwrap();
    });

    let mut client = Client::<QueueConnector>::builder("7")
        .max_batch_bytes(4096)
        .build(QueueConnector::new(vec![near]));
    let err = client.run(VecSource::new(bets(2))).await.unwrap_err();

    assert!(matches!(err, BetwireError::RemoteError));
    server.await.unwrap();
}

#[tokio::test]
async fn test_unrecognized_ack_is_recorded_and_the_loop_continues() {
    let (batch_near, batch_far) = duplex(4096);
    let (poll_near, poll_far) = duplex(4096);

    let server = tokio::spawn(async move {
        let mut transport = FrameTransport::new(batch_far);
        let mut acks = ["partial", "success"].iter();
        loop {
            let text = transport.recv_text().await.unwrap();
            if text == "exit" {
                break;
            }
            transport.send(acks.next().unwrap().as_bytes()).await.unwrap();
        }

        let mut transport = FrameTransport::new(poll_far);
        let _ = transport.recv().await.unwrap();
        transport.send(b"[]").await.unwrap();
    });

    // Two records that cannot share a batch.
    let input = bets(2);
    let max = input[0].serialize().len();

    let mut client = Client::<QueueConnector>::builder("7")
        .max_batch_bytes(max)
        .build(QueueConnector::new(vec![batch_near, poll_near]));
    let outcome = client.run(VecSource::new(input)).await.unwrap();

    match outcome {
        SessionOutcome::Done(report) => {
            assert_eq!(report.batches_sent, 2);
            assert_eq!(report.records_rejected, 1);
            assert_eq!(report.records_accepted, 1);
        }
        other => panic!("expected Done, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_poll_retries_until_winners_are_ready() {
    let (batch_near, batch_far) = duplex(4096);
    let (poll1_near, poll1_far) = duplex(4096);
    let (poll2_near, poll2_far) = duplex(4096);
    let (poll3_near, poll3_far) = duplex(4096);

    let server = tokio::spawn(async move {
        let mut transport = FrameTransport::new(batch_far);
        loop {
            let text = transport.recv_text().await.unwrap();
            if text == "exit" {
                break;
            }
            transport.send(b"success").await.unwrap();
        }

        let mut polls = 0;
        for far in [poll1_far, poll2_far] {
            let mut transport = FrameTransport::new(far);
            let request = transport.recv_text().await.unwrap();
            assert_eq!(request, "winners;7");
            transport.send(b"error").await.unwrap();
            polls += 1;
        }

        let mut transport = FrameTransport::new(poll3_far);
        let _ = transport.recv().await.unwrap();
        transport.send(br#"["1", "2", "3"]"#).await.unwrap();
        polls + 1
    });

    let mut client = Client::<QueueConnector>::builder("7")
        .poll_period(Duration::from_millis(5))
        .poll_backoff_factor(1)
        .build(QueueConnector::new(vec![
            batch_near, poll1_near, poll2_near, poll3_near,
        ]));
    let outcome = client.run(VecSource::new(bets(1))).await.unwrap();

    assert_eq!(server.await.unwrap(), 3);
    match outcome {
        SessionOutcome::Done(report) => assert_eq!(report.winners.len(), 3),
        other => panic!("expected Done, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_between_batches_stops_before_the_next_send() {
    let (near, far) = duplex(4096);
    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();

    let server = tokio::spawn(async move {
        let mut transport = FrameTransport::new(far);
        let first = transport.recv_text().await.unwrap();
        assert_ne!(first, "exit");

        // Stop the client before acknowledging, so the flag is already set
        // when the client returns to the top of its loop.
        server_cancel.cancel();
        transport.send(b"success").await.unwrap();

        // Nothing else may arrive: no second batch, no exit notice.
        assert!(transport.recv().await.is_err());
    });

    let input = bets(4);
    let max = input[0].serialize().len();

    let mut client = Client::<QueueConnector>::builder("7")
        .max_batch_bytes(max)
        .cancellation_token(cancel)
        .build(QueueConnector::new(vec![near]));
    let outcome = client.run(VecSource::new(input)).await.unwrap();

    match outcome {
        SessionOutcome::Stopped(report) => {
            assert_eq!(report.batches_sent, 1);
            assert_eq!(report.records_accepted, 1);
            assert!(report.winners.is_empty());
        }
        other => panic!("expected Stopped, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_cancellation_during_the_poll_wait_skips_the_next_attempt() {
    let (batch_near, batch_far) = duplex(4096);
    let (poll1_near, poll1_far) = duplex(4096);
    let (poll2_near, poll2_far) = duplex(4096);
    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();

    let server = tokio::spawn(async move {
        let mut transport = FrameTransport::new(batch_far);
        loop {
            let text = transport.recv_text().await.unwrap();
            if text == "exit" {
                break;
            }
            transport.send(b"success").await.unwrap();
        }

        let mut transport = FrameTransport::new(poll1_far);
        let _ = transport.recv().await.unwrap();
        transport.send(b"error").await.unwrap();

        // Stop the client while it waits out the second backoff.
        let mut transport = FrameTransport::new(poll2_far);
        let _ = transport.recv().await.unwrap();
        server_cancel.cancel();
        transport.send(b"error").await.unwrap();
    });

    // The token is cancelled before the second "error" reply arrives, so
    // the second backoff wait must end in Stopped. Two poll connections
    // are scripted; a third attempt would fail loudly.
    let mut client = Client::<QueueConnector>::builder("7")
        .poll_period(Duration::from_millis(5))
        .cancellation_token(cancel)
        .build(QueueConnector::new(vec![batch_near, poll1_near, poll2_near]));
    let outcome = client.run(VecSource::new(bets(1))).await.unwrap();

    match outcome {
        SessionOutcome::Stopped(report) => {
            assert_eq!(report.records_accepted, 1);
            assert!(report.winners.is_empty());
        }
        other => panic!("expected Stopped, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_drop_mid_session_is_fatal() {
    let (near, far) = duplex(4096);

    let server = tokio::spawn(async move {
        let mut transport = FrameTransport::new(far);
        let _ = transport.recv().await.unwrap();
        // Drop without acknowledging.
    });

    let mut client = Client::<QueueConnector>::builder("7").build(QueueConnector::new(vec![near]));
    let err = client.run(VecSource::new(bets(1))).await.unwrap_err();

    assert!(matches!(err, BetwireError::ConnectionClosed));
    server.await.unwrap();
}

#[tokio::test]
async fn test_session_over_real_tcp() {
    use betwire_client::TcpConnector;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut transport = FrameTransport::new(stream);
        let mut records = 0;
        loop {
            let payload = transport.recv().await.unwrap();
            let text = String::from_utf8(payload.to_vec()).unwrap();
            if text == "exit" {
                break;
            }
            records += text.matches(';').count() / 6;
            transport.send(b"success").await.unwrap();
        }

        let (stream, _) = listener.accept().await.unwrap();
        let mut transport = FrameTransport::new(stream);
        let _ = transport.recv().await.unwrap();
        transport.send(br#"["30000000"]"#).await.unwrap();
        records
    });

    let mut client = Client::<TcpConnector>::builder("7").build(TcpConnector::new(addr.to_string()));
    let outcome = client.run(VecSource::new(bets(5))).await.unwrap();

    assert_eq!(server.await.unwrap(), 5);
    match outcome {
        SessionOutcome::Done(report) => {
            assert_eq!(report.records_accepted, 5);
            assert_eq!(report.winners, vec!["30000000"]);
        }
        other => panic!("expected Done, got {:?}", other),
    }
}
