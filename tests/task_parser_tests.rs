use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use coinpilot::{
    models::{Task, TaskKind},
    services::task_parser::{
        format_local, offset_label, parse_alpha_task, parse_simple_task, parse_task_input, TaskParseError,
    },
};

fn plus7() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

#[test]
fn day_month_time_uses_local_offset_and_current_year() {
    let parsed = parse_task_input("25/12 09:00 - Claim", now(), plus7()).unwrap();

    assert_eq!(parsed.time_utc, Utc.with_ymd_and_hms(2025, 12, 25, 2, 0, 0).unwrap());
    assert_eq!(parsed.name, "Claim");
}

#[test]
fn explicit_year_and_time_only_forms() {
    let parsed = parse_task_input("25/12/2026 09:00 - Claim", now(), plus7()).unwrap();
    assert_eq!(parsed.time_utc, Utc.with_ymd_and_hms(2026, 12, 25, 2, 0, 0).unwrap());

    // 07:00 local on 1 June; 23:30 is still ahead today
    let parsed = parse_task_input("23:30 - Late call", now(), plus7()).unwrap();
    assert_eq!(parsed.time_utc, Utc.with_ymd_and_hms(2025, 6, 1, 16, 30, 0).unwrap());
    assert_eq!(parsed.name, "Late call");
}

#[test]
fn bracket_form_carries_its_own_offset() {
    let parsed = parse_task_input("<09:00 UTC+7 25/12/2030>:Claim token X", now(), FixedOffset::east_opt(0).unwrap())
        .unwrap();

    assert_eq!(parsed.time_utc, Utc.with_ymd_and_hms(2030, 12, 25, 2, 0, 0).unwrap());
    assert_eq!(parsed.name, "Claim token X");
}

#[test]
fn past_dates_are_rejected() {
    assert_eq!(
        parse_task_input("01/01 09:00 - Old", now(), plus7()),
        Err(TaskParseError::PastDate)
    );
    assert_eq!(
        parse_task_input("06:59 - Just missed", now(), plus7()),
        Err(TaskParseError::PastDate)
    );
}

#[test]
fn malformed_and_impossible_inputs() {
    assert_eq!(parse_task_input("tomorrow - x", now(), plus7()), Err(TaskParseError::Format));
    assert_eq!(
        parse_task_input("31/02 09:00 - Nope", now(), plus7()),
        Err(TaskParseError::InvalidDate)
    );
    assert_eq!(
        parse_task_input("25/12 25:00 - Nope", now(), plus7()),
        Err(TaskParseError::InvalidDate)
    );
}

#[test]
fn simple_task_is_tagged_simple() {
    let task = parse_simple_task("25/12 09:00 - Claim", now(), plus7()).unwrap();
    assert_eq!(task.kind, TaskKind::Simple);
    assert!(!task.is_alpha());
}

#[test]
fn alpha_task_peels_amount_and_contract() {
    let task = parse_alpha_task(
        "25/12 15:00 - Alpha ABC 1,000 0xBB4CDB9CBD36B01BD1CBAEBF2DE08D9173BC095C",
        now(),
        plus7(),
    )
    .unwrap();

    assert_eq!(task.name, "Alpha ABC");
    assert_eq!(
        task.kind,
        TaskKind::Alpha {
            amount: Some(1000.0),
            contract: Some("0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c".to_string()),
        }
    );

    // a lone number stays the name
    let task = parse_alpha_task("25/12 15:00 - 1000", now(), plus7()).unwrap();
    assert_eq!(task.name, "1000");
    assert_eq!(task.kind, TaskKind::Alpha { amount: None, contract: None });
}

#[test]
fn task_json_shape() {
    let raw = r#"{"type":"alpha","time_iso":"2025-12-25T02:00:00Z","name":"Alpha ABC","amount":5.0}"#;
    let task: Task = serde_json::from_str(raw).unwrap();
    assert_eq!(task.kind, TaskKind::Alpha { amount: Some(5.0), contract: None });

    let v = serde_json::to_value(Task::simple(task.time_iso, "Claim")).unwrap();
    assert_eq!(v["type"], "simple");
    assert_eq!(v["name"], "Claim");
}

#[test]
fn local_formatting() {
    let t = Utc.with_ymd_and_hms(2025, 12, 25, 2, 0, 0).unwrap();
    assert_eq!(format_local(t, plus7()), "09:00 25/12/2025");
    assert_eq!(offset_label(plus7()), "UTC+7");
    assert_eq!(offset_label(FixedOffset::west_opt(5 * 3600 + 1800).unwrap()), "UTC-5:30");
}
