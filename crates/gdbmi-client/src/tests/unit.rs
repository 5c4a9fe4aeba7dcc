//! Round trips between a session and a scripted debugger.

use std::thread;
use std::time::Duration;

use rstest::rstest;

use crate::tests::support::connect;
use crate::{ClientError, NotificationCallback, Record, RecordKind, notification_channel};

const OPERATIONS: [&str; 3] = ["exec-run", "stack-list-frames", "thread-info"];

#[rstest]
fn concurrent_sends_receive_their_own_replies() {
    let (session, mut fake) = connect(None);

    let shared = &session;
    thread::scope(|scope| {
        let calls: Vec<_> = OPERATIONS
            .into_iter()
            .map(|operation| scope.spawn(move || shared.send(operation, &[])))
            .collect();

        let mut commands: Vec<_> = (0..OPERATIONS.len())
            .map(|_| fake.read_command())
            .collect();
        commands.reverse();
        for command in &commands {
            fake.answer(command, &format!("^done,op=\"{}\"", command.operation));
        }

        for (call, operation) in calls.into_iter().zip(OPERATIONS) {
            let record = call.join().expect("caller thread").expect("reply");
            assert_eq!(record.kind(), RecordKind::Result);
            assert_eq!(record.sequence(), None);
            assert_eq!(
                record.payload().and_then(|payload| payload.get_str("op")),
                Some(operation)
            );
        }
    });

    assert_eq!(session.pending_requests(), 0);
}

#[rstest]
fn arguments_are_quoted_only_when_needed() {
    let (session, mut fake) = connect(None);

    thread::scope(|scope| {
        let call = scope.spawn(|| session.send("break-insert", &["two words", "5"]));

        let command = fake.read_command();
        assert_eq!(command.line, r#"1-break-insert "two words" 5"#);
        fake.answer(&command, "^done");

        let record = call.join().expect("caller thread").expect("reply");
        assert_eq!(record.class(), Some("done"));
    });
}

#[rstest]
fn checked_send_surfaces_debugger_message() {
    let (session, mut fake) = connect(None);

    thread::scope(|scope| {
        let call = scope.spawn(|| session.checked_send("break-insert", &["nosuch"]));

        let command = fake.read_command();
        fake.answer(&command, r#"^error,msg="No symbol""#);

        let error = call.join().expect("caller thread").expect_err("error reply");
        assert_eq!(error.command_message(), Some("No symbol"));
    });
}

#[rstest]
fn unchecked_send_returns_error_record() {
    let (session, mut fake) = connect(None);

    thread::scope(|scope| {
        let call = scope.spawn(|| session.send("break-insert", &["nosuch"]));

        let command = fake.read_command();
        fake.answer(&command, r#"^error,msg="No symbol""#);

        let record = call.join().expect("caller thread").expect("reply");
        assert!(record.as_result().is_some_and(|result| result.is_error()));
    });
}

#[rstest]
fn end_of_stream_releases_pending_callers() {
    let (session, mut fake) = connect(None);

    let shared = &session;
    thread::scope(|scope| {
        let calls: Vec<_> = ["exec-continue", "thread-info"]
            .into_iter()
            .map(|operation| scope.spawn(move || shared.send(operation, &[])))
            .collect();

        fake.read_command();
        fake.read_command();
        fake.hang_up();

        for call in calls {
            let result = call.join().expect("caller thread");
            assert!(matches!(result, Err(ClientError::SessionClosed { .. })));
        }
    });

    assert!(session.is_closed());
    assert!(matches!(
        session.send("thread-info", &[]),
        Err(ClientError::SessionClosed { .. })
    ));
}

#[rstest]
fn timeout_removes_the_pending_slot() {
    let (session, mut fake) = connect(None);

    let result = session.send_timeout("exec-continue", &[], Duration::from_millis(20));

    assert!(matches!(result, Err(ClientError::Timeout { ref sequence, .. }) if sequence == "1"));
    assert_eq!(session.pending_requests(), 0);

    let late = fake.read_command();
    fake.answer(&late, "^running");

    thread::scope(|scope| {
        let call = scope.spawn(|| session.send("thread-info", &[]));
        let command = fake.read_command();
        assert_eq!(command.sequence, "2");
        fake.answer(&command, "^done");
        assert!(call.join().expect("caller thread").is_ok());
    });
}

#[rstest]
fn malformed_reply_fails_only_its_caller() {
    let (session, mut fake) = connect(None);

    thread::scope(|scope| {
        let broken = scope.spawn(|| session.send("data-evaluate-expression", &["x"]));
        let command = fake.read_command();
        fake.answer(&command, "^done,value=");
        let result = broken.join().expect("caller thread");
        assert!(matches!(result, Err(ClientError::Parse { .. })));

        let healthy = scope.spawn(|| session.send("data-evaluate-expression", &["x"]));
        let command = fake.read_command();
        fake.answer(&command, r#"^done,value="5""#);
        let record = healthy.join().expect("caller thread").expect("reply");
        assert_eq!(
            record.payload().and_then(|payload| payload.get_str("value")),
            Some("5")
        );
    });
}

#[rstest]
fn unmatched_reply_is_survived() {
    let (session, mut fake) = connect(None);

    fake.emit("99^done");

    thread::scope(|scope| {
        let call = scope.spawn(|| session.send("thread-info", &[]));
        let command = fake.read_command();
        fake.answer(&command, "^done");
        assert!(call.join().expect("caller thread").is_ok());
    });
    assert!(!session.is_closed());
}

#[rstest]
fn notifications_arrive_in_read_order() {
    let (callback, notifications) = notification_channel();
    let (session, mut fake) = connect(Some(callback));

    fake.emit(r#"=thread-group-added,id="i1""#);
    fake.emit("(gdb) ");
    fake.emit(r#"~"Starting program\n""#);
    fake.emit("^running");
    fake.emit(r#"*running,thread-id="all""#);
    fake.emit("");
    fake.emit(r#"@"target output""#);
    fake.hang_up();

    assert_eq!(session.exit().expect("exit"), None);

    let kinds: Vec<_> = notifications.iter().map(|record| Record::kind(&record)).collect();
    assert_eq!(
        kinds,
        vec![
            RecordKind::Notify,
            RecordKind::Console,
            RecordKind::Result,
            RecordKind::Exec,
            RecordKind::Target,
        ]
    );
}

#[rstest]
fn panicking_callback_releases_waiting_callers() {
    let callback: NotificationCallback = Box::new(|_| panic!("callback failed"));
    let (session, mut fake) = connect(Some(callback));

    thread::scope(|scope| {
        let call = scope.spawn(|| session.send_timeout("thread-info", &[], Duration::from_secs(5)));

        fake.read_command();
        fake.emit(r#"=thread-group-added,id="i1""#);

        let result = call.join().expect("caller thread");
        assert!(matches!(result, Err(ClientError::SessionClosed { .. })));
    });

    assert!(session.is_closed());
    assert!(matches!(
        session.send("thread-info", &[]),
        Err(ClientError::SessionClosed { .. })
    ));
    assert!(matches!(session.exit(), Err(ClientError::ReaderPanicked)));
}

#[rstest]
fn interrupt_needs_a_process() {
    let (session, _fake) = connect(None);

    assert!(matches!(session.interrupt(), Err(ClientError::NoProcess)));
    assert_eq!(session.pid(), None);
}

#[rstest]
fn exit_sends_exit_command_and_waits_for_reader() {
    let (session, mut fake) = connect(None);

    thread::scope(|scope| {
        let exit = scope.spawn(|| session.exit());

        let command = fake.read_command();
        assert_eq!(command.operation, "gdb-exit");
        fake.answer(&command, "^exit");
        fake.hang_up();

        assert_eq!(exit.join().expect("exit thread").expect("exit"), None);
    });

    assert!(session.is_closed());
    assert_eq!(session.exit().expect("second exit"), None);
}

#[rstest]
fn invalid_operation_is_rejected_before_writing() {
    let (session, _fake) = connect(None);

    assert!(matches!(
        session.send("exec run", &[]),
        Err(ClientError::InvalidOperation { .. })
    ));
    assert_eq!(session.pending_requests(), 0);
}
