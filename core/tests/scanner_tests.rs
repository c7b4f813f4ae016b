use sheet_audit::scanner::{discover_files, NO_FILES_MESSAGE};
use sheet_audit::{scan, AuditConfig, FileStatus, RuleOptions, ScanEvent};
use std::collections::BTreeMap;

mod common;
use common::{passing_workbook, WorkbookBuilder};

fn drain(rx: std::sync::mpsc::Receiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    for event in rx.iter() {
        let finished = matches!(event, ScanEvent::Finished);
        events.push(event);
        if finished {
            break;
        }
    }
    // Finished is terminal; nothing further may arrive.
    assert!(rx.try_recv().is_err());
    events
}

#[test]
fn empty_directory_reports_info_then_finished() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (handle, rx) =
        scan(dir.path(), AuditConfig::default(), RuleOptions::new(), 2).expect("scan");
    let events = drain(rx);
    handle.join();

    assert_eq!(events.len(), 2);
    let ScanEvent::Result(result) = &events[0] else {
        panic!("expected a result event");
    };
    assert_eq!(result.status, FileStatus::Info);
    assert_eq!(result.diagnostic_text(), NO_FILES_MESSAGE);
    assert!(matches!(events[1], ScanEvent::Finished));
}

#[test]
fn discovery_skips_lock_files_and_foreign_extensions() {
    let dir = tempfile::tempdir().expect("tempdir");
    passing_workbook().write_to(&dir.path().join("a.xlsx"));
    passing_workbook().write_to(&dir.path().join("~$a.xlsx"));
    std::fs::write(dir.path().join("notes.txt"), b"text").expect("write");
    let sub = dir.path().join("nested");
    std::fs::create_dir(&sub).expect("mkdir");
    passing_workbook().write_to(&sub.join("b.XLSM"));

    let files = discover_files(dir.path(), &AuditConfig::default());
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string())
        .collect();
    assert_eq!(names, ["a.xlsx", "b.XLSM"]);
}

#[test]
fn every_discovered_file_gets_exactly_one_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    passing_workbook().write_to(&dir.path().join("good.xlsx"));
    WorkbookBuilder::new()
        .sheet("Sheet1")
        .write_to(&dir.path().join("bad.xlsx"));
    std::fs::write(dir.path().join("broken.xlsx"), b"garbage").expect("write");

    let (handle, rx) =
        scan(dir.path(), AuditConfig::default(), RuleOptions::new(), 3).expect("scan");
    let events = drain(rx);
    handle.join();

    let mut statuses = BTreeMap::new();
    let mut progress_max = 0;
    let mut finished = 0;
    for event in events {
        match event {
            ScanEvent::Result(result) => {
                statuses.insert(result.relative.clone(), result.status);
            }
            ScanEvent::Progress { completed, total } => {
                assert_eq!(total, 3);
                progress_max = progress_max.max(completed);
            }
            ScanEvent::Finished => finished += 1,
        }
    }
    assert_eq!(finished, 1);
    assert_eq!(progress_max, 3);
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses["good.xlsx"], FileStatus::Ok);
    assert_eq!(statuses["bad.xlsx"], FileStatus::Error);
    assert_eq!(statuses["broken.xlsx"], FileStatus::Error);
}

#[test]
fn cancelling_before_any_work_marks_files_cancelled() {
    let dir = tempfile::tempdir().expect("tempdir");
    for i in 0..4 {
        passing_workbook().write_to(&dir.path().join(format!("f{i}.xlsx")));
    }

    let (handle, rx) =
        scan(dir.path(), AuditConfig::default(), RuleOptions::new(), 1).expect("scan");
    handle.cancel();
    let events = drain(rx);
    handle.join();

    let mut finished = 0;
    let mut seen = 0;
    for event in events {
        match event {
            ScanEvent::Result(result) => {
                seen += 1;
                // Workers may have finished a file before the flag landed.
                if result.status == FileStatus::Cancelled {
                    assert_eq!(result.diagnostic_text(), "Stopped by user");
                }
            }
            ScanEvent::Progress { .. } => {}
            ScanEvent::Finished => finished += 1,
        }
    }
    assert_eq!(finished, 1);
    assert_eq!(seen, 4);
}

#[test]
fn overrunning_file_times_out_and_reports_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    WorkbookBuilder::new()
        .sheet("表紙")
        .filled_rows(60_000)
        .write_to(&dir.path().join("slow.xlsx"));

    let config = AuditConfig {
        file_timeout_ms: 1,
        ..AuditConfig::default()
    };
    let (handle, rx) = scan(dir.path(), config, RuleOptions::new(), 1).expect("scan");
    let events = drain(rx);
    handle.join();

    let results: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Result(result) => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, FileStatus::Error);
    assert_eq!(results[0].diagnostic_text(), "Timed out after 1 ms");
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, ScanEvent::Finished))
            .count(),
        1
    );
}

#[test]
fn cancelling_mid_batch_still_yields_one_result_per_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    for i in 0..5 {
        WorkbookBuilder::new()
            .sheet("表紙")
            .filled_rows(30_000)
            .write_to(&dir.path().join(format!("f{i}.xlsx")));
    }

    let (handle, rx) =
        scan(dir.path(), AuditConfig::default(), RuleOptions::new(), 1).expect("scan");
    let mut events = Vec::new();
    let mut cancelled = false;
    for event in rx.iter() {
        if matches!(event, ScanEvent::Result(_)) && !cancelled {
            // Stop the batch as soon as the first file reports.
            handle.cancel();
            cancelled = true;
        }
        let finished = matches!(event, ScanEvent::Finished);
        events.push(event);
        if finished {
            break;
        }
    }
    assert!(rx.try_recv().is_err());
    handle.join();

    let results: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Result(result) => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 5);
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, ScanEvent::Finished))
            .count(),
        1
    );
    // The file in flight when the flag landed may still complete, but the
    // tail of the batch must be cut short.
    assert_eq!(results[4].status, FileStatus::Cancelled);
    for result in results {
        if result.status == FileStatus::Cancelled {
            assert_eq!(result.diagnostic_text(), "Stopped by user");
        }
    }
}

#[test]
fn single_worker_results_arrive_in_path_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    passing_workbook().write_to(&dir.path().join("a.xlsx"));
    passing_workbook().write_to(&dir.path().join("b.xlsx"));
    passing_workbook().write_to(&dir.path().join("c.xlsx"));

    let (handle, rx) =
        scan(dir.path(), AuditConfig::default(), RuleOptions::new(), 1).expect("scan");
    let events = drain(rx);
    handle.join();

    let order: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Result(result) => Some(result.relative.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(order, ["a.xlsx", "b.xlsx", "c.xlsx"]);
}
