//! Integration tests for ReaderSession
//!
//! These tests verify:
//! - The startup protocol order (create → connect → region → read plan)
//! - Unwinding of earlier steps when a later step fails
//! - Idempotent, exactly-once teardown (explicit close and Drop)
//! - "No tags" is an empty read, not a failure

use mockall::{Sequence, mock};
use rfid_tmreader::models::{ReaderConfig, Region};
use rfid_tmreader::reader::{
    ConfigStep, DriverError, ReadPlan, ReaderDriver, ReaderError, ReaderSession,
};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

mock! {
    pub Driver {}

    impl ReaderDriver for Driver {
        fn create(&mut self) -> Result<(), DriverError>;
        fn connect(&mut self, uri: &str) -> Result<(), DriverError>;
        fn set_region(&mut self, region: Region) -> Result<(), DriverError>;
        fn set_read_plan(&mut self, plan: &ReadPlan) -> Result<(), DriverError>;
        fn read_epcs(
            &mut self,
            out: &mut Vec<String>,
            max_tags: usize,
            epc_buf_size: usize,
            timeout: Duration,
        ) -> Result<(), DriverError>;
        fn disconnect(&mut self);
        fn destroy(&mut self);
    }
}

fn test_config() -> ReaderConfig {
    ReaderConfig {
        uri: "tmr:///dev/ttyUSB0".to_string(),
        antennas: vec![1, 2],
        ..ReaderConfig::default()
    }
}

/// Driver that opens successfully and expects exactly one teardown.
fn openable_driver() -> MockDriver {
    let mut driver = MockDriver::new();
    driver.expect_create().times(1).returning(|| Ok(()));
    driver.expect_connect().times(1).returning(|_| Ok(()));
    driver.expect_set_region().times(1).returning(|_| Ok(()));
    driver
        .expect_set_read_plan()
        .withf(|plan| plan.antennas == [1, 2] && plan.session.is_none())
        .times(1)
        .returning(|_| Ok(()));
    driver.expect_disconnect().times(1).return_const(());
    driver.expect_destroy().times(1).return_const(());
    driver
}

#[test]
fn test_startup_protocol_order() {
    let mut seq = Sequence::new();
    let mut driver = MockDriver::new();

    driver
        .expect_create()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));
    driver
        .expect_connect()
        .withf(|uri| uri == "tmr:///dev/ttyUSB0")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    driver
        .expect_set_region()
        .withf(|region| *region == Region::Kr2)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    driver
        .expect_set_read_plan()
        .withf(|plan| plan.antennas == [1, 2] && plan.raw_session() == -1)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    driver
        .expect_disconnect()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    driver
        .expect_destroy()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let session = ReaderSession::open(driver, &test_config()).unwrap();
    assert!(session.is_open());
}

#[test]
fn test_allocation_failure_acquires_nothing() {
    let mut driver = MockDriver::new();
    driver
        .expect_create()
        .times(1)
        .returning(|| Err(DriverError::Allocation("out of handles".to_string())));
    driver.expect_connect().never();
    driver.expect_disconnect().never();
    driver.expect_destroy().never();

    let err = ReaderSession::open(driver, &test_config()).unwrap_err();
    assert!(matches!(err, ReaderError::Allocation(_)));
    assert!(err.is_startup_error());
}

#[test]
fn test_connect_failure_releases_handle() {
    let mut driver = MockDriver::new();
    driver.expect_create().times(1).returning(|| Ok(()));
    driver
        .expect_connect()
        .times(1)
        .returning(|_| Err(DriverError::Transport("no such device".to_string())));
    driver.expect_set_region().never();
    driver.expect_disconnect().never();
    driver.expect_destroy().times(1).return_const(());

    let err = ReaderSession::open(driver, &test_config()).unwrap_err();
    assert_eq!(
        err,
        ReaderError::Connect {
            uri: "tmr:///dev/ttyUSB0".to_string(),
            source: DriverError::Transport("no such device".to_string()),
        }
    );
}

#[test]
fn test_startup_error_chain_names_driver_cause_once() {
    let mut driver = MockDriver::new();
    driver.expect_create().times(1).returning(|| Ok(()));
    driver
        .expect_connect()
        .times(1)
        .returning(|_| Err(DriverError::Transport("no such device".to_string())));
    driver.expect_destroy().times(1).return_const(());

    let err = ReaderSession::open(driver, &test_config()).unwrap_err();
    let chain = format!("{:#}", anyhow::Error::new(err).context("Reader startup failed"));

    assert!(chain.starts_with("Reader startup failed: Failed to connect to tmr:///dev/ttyUSB0"));
    assert_eq!(chain.matches("no such device").count(), 1, "{}", chain);
}

#[test]
fn test_region_failure_disconnects_then_releases() {
    let mut seq = Sequence::new();
    let mut driver = MockDriver::new();
    driver.expect_create().times(1).returning(|| Ok(()));
    driver.expect_connect().times(1).returning(|_| Ok(()));
    driver
        .expect_set_region()
        .times(1)
        .returning(|_| Err(DriverError::Rejected("region locked".to_string())));
    driver.expect_set_read_plan().never();
    driver
        .expect_disconnect()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    driver
        .expect_destroy()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let err = ReaderSession::open(driver, &test_config()).unwrap_err();
    assert!(matches!(
        err,
        ReaderError::Config {
            step: ConfigStep::Region,
            ..
        }
    ));
}

#[test]
fn test_initial_read_plan_failure_disconnects_then_releases() {
    let mut driver = MockDriver::new();
    driver.expect_create().times(1).returning(|| Ok(()));
    driver.expect_connect().times(1).returning(|_| Ok(()));
    driver.expect_set_region().times(1).returning(|_| Ok(()));
    driver
        .expect_set_read_plan()
        .times(1)
        .returning(|_| Err(DriverError::Rejected("antenna 2 not connected".to_string())));
    driver.expect_disconnect().times(1).return_const(());
    driver.expect_destroy().times(1).return_const(());

    let err = ReaderSession::open(driver, &test_config()).unwrap_err();
    assert!(matches!(
        err,
        ReaderError::Config {
            step: ConfigStep::ReadPlan,
            ..
        }
    ));
    assert!(err.to_string().contains("read plan"));
}

#[test]
fn test_teardown_runs_once() {
    let mut session = ReaderSession::open(openable_driver(), &test_config()).unwrap();

    session.close();
    session.close();
    assert!(!session.is_open());

    // Drop must not disconnect again; the mock verifies times(1)
    drop(session);
}

#[test]
fn test_drop_closes_open_session() {
    let session = ReaderSession::open(openable_driver(), &test_config()).unwrap();
    drop(session);
}

#[test]
fn test_no_tags_error_is_empty_read() {
    let mut driver = openable_driver();
    driver
        .expect_read_epcs()
        .times(1)
        .returning(|_, _, _, _| Err(DriverError::NoTags));

    let mut session = ReaderSession::open(driver, &test_config()).unwrap();
    let mut buf = Vec::with_capacity(4);

    let count = assert_ok!(session.read_epcs(&mut buf, 4, 256, Duration::from_millis(200)));
    assert_eq!(count, 0);
    assert!(buf.is_empty());
}

#[test]
fn test_read_fault_discards_partial_results() {
    let mut driver = openable_driver();
    driver.expect_read_epcs().times(1).returning(|out, _, _, _| {
        out.push("E1".to_string());
        Err(DriverError::Transport("crc error".to_string()))
    });

    let mut session = ReaderSession::open(driver, &test_config()).unwrap();
    let mut buf = Vec::new();

    let err = assert_err!(session.read_epcs(&mut buf, 4, 256, Duration::from_millis(200)));
    assert_eq!(err, ReaderError::Read(DriverError::Transport("crc error".to_string())));
    assert!(buf.is_empty());
}

#[test]
fn test_read_passes_limits_to_driver() {
    let mut driver = openable_driver();
    driver
        .expect_read_epcs()
        .withf(|_, max_tags, epc_buf_size, timeout| {
            *max_tags == 64 && *epc_buf_size == 256 && *timeout == Duration::from_millis(200)
        })
        .times(1)
        .returning(|out, _, _, _| {
            out.push("E200".to_string());
            Ok(())
        });

    let config = test_config();
    let mut session = ReaderSession::open(driver, &config).unwrap();
    let mut buf = Vec::new();

    let count = session
        .read_epcs(&mut buf, config.max_tags, config.epc_buf_size, config.timeout())
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(buf, vec!["E200".to_string()]);
}
