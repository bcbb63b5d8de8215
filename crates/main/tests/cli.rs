use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

const HEADER: &str = "employee_name,employee_id,basic_pay,Housing,Transport,other_allowances,tax,employee_pension,other_deductions,email";

fn payslip() -> Command {
    let mut cmd = Command::new(cargo_bin!("payslip"));
    for var in [
        "PAYSLIP_LOGO",
        "PAYSLIP_LOGO_FALLBACK",
        "PAYSLIP_LETTERHEAD",
        "PAYSLIP_FOOTER",
        "PAYSLIP_CURRENCY_SYMBOL",
        "PAYSLIP_SMTP_HOST",
        "PAYSLIP_SMTP_PORT",
        "PAYSLIP_SMTP_FROM",
        "PAYSLIP_SMTP_TLS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn single_with_defaults_prints_totals() {
    let dir = tempfile::tempdir().unwrap();

    payslip()
        .args(["single", "--pay-date", "2024-05-31", "--output-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Total earnings: ₦ 775,000.00"))
        .stdout(predicate::str::contains("Total deductions: ₦ 157,000.00"))
        .stdout(predicate::str::contains("Net pay: ₦ 618,000.00"));

    let pdf = fs::read(dir.path().join("James_Arthur_payslip.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn single_prints_data_uri() {
    let dir = tempfile::tempdir().unwrap();

    payslip()
        .args(["single", "--employee-name", "Ada Obi", "--data-uri", "--currency", "NGN"])
        .arg("--output-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Net pay: NGN 618,000.00"))
        .stdout(predicate::str::contains("data:application/pdf;base64,"));

    assert!(dir.path().join("Ada_Obi_payslip.pdf").exists());
}

#[test]
fn unreachable_logo_does_not_fail() {
    let dir = tempfile::tempdir().unwrap();

    payslip()
        .args(["--logo", "http://127.0.0.1:9/logo.png", "--asset-timeout", "1"])
        .args(["single", "--output-dir"])
        .arg(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("James_Arthur_payslip.pdf").exists());
}

#[test]
fn batch_exports_roster() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("staff.csv");
    fs::write(
        &roster,
        format!(
            "{HEADER}\n\
             James Arthur,0077,400000,200000,150000,25000,100000,57000,0,james@example.com\n\
             Ada Obi,0078,300000,N/A,100000,0,50000,20000,0,ada@example.com\n"
        ),
    )
    .unwrap();
    let out = dir.path().join("out");

    payslip()
        .arg("batch")
        .arg(&roster)
        .args(["--pay-date", "2024-05-31", "--export-dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 of 2 payslips"));

    assert!(out.join("James_Arthur_payslip.pdf").exists());
    assert!(out.join("Ada_Obi_payslip.pdf").exists());
}

#[test]
fn batch_rejects_unsupported_format() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("staff.xlsx");
    fs::write(&roster, b"PK\x03\x04").unwrap();

    payslip()
        .arg("batch")
        .arg(&roster)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported roster format 'xlsx'"));
}

#[test]
fn batch_reports_missing_columns() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("staff.csv");
    fs::write(&roster, "employee_name,basic_pay\nAda,1\n").unwrap();

    payslip()
        .arg("batch")
        .arg(&roster)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing required columns"));
}

#[test]
fn batch_email_requires_smtp() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("staff.csv");
    fs::write(&roster, format!("{HEADER}\nAda,1,1,1,1,1,1,1,1,ada@example.com\n")).unwrap();

    payslip()
        .current_dir(dir.path())
        .arg("batch")
        .arg(&roster)
        .arg("--email")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SMTP is not configured"));
}

#[test]
fn malformed_smtp_settings_only_block_email() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("staff.csv");
    fs::write(&roster, format!("{HEADER}\nAda,1,1,1,1,1,1,1,1,ada@example.com\n")).unwrap();

    let with_bad_port = || {
        let mut cmd = payslip();
        cmd.current_dir(dir.path())
            .env("PAYSLIP_SMTP_HOST", "smtp.example.com")
            .env("PAYSLIP_SMTP_FROM", "payroll@example.com")
            .env("PAYSLIP_SMTP_PORT", "abc");
        cmd
    };

    with_bad_port()
        .args(["single", "--output-dir", "out"])
        .assert()
        .success();
    assert!(dir.path().join("out/James_Arthur_payslip.pdf").exists());

    with_bad_port()
        .arg("batch")
        .arg(&roster)
        .arg("--email")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PAYSLIP_SMTP_PORT"));
}

#[test]
fn email_and_export_dir_conflict() {
    payslip()
        .args(["batch", "staff.csv", "--email", "--export-dir", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
