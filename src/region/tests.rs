//! Unit tests for the managed-region editor.

use super::*;
use rstest::{fixture, rstest};

const START: &str = "# BEGIN dropsync";
const END: &str = "# END dropsync";

#[fixture]
fn instance() -> ResolvedInstance {
    ResolvedInstance {
        host: String::from("do-prod"),
        name: String::from("web1"),
        ip: String::from("10.0.0.1"),
        identity_file: String::from("~/.ssh/id_prod"),
    }
}

fn file_with_region(inner: &str) -> String {
    format!("Host gateway\n    Port 2222\n{START}\n{inner}{END}\n# trailing comment\n")
}

#[rstest]
fn split_keeps_marker_lines_on_the_boundaries() {
    let content = file_with_region("stale line\n");

    let managed =
        ManagedFile::split(&content, START, END).unwrap_or_else(|err| panic!("split: {err}"));

    assert_eq!(
        managed.prefix,
        ["Host gateway\n", "    Port 2222\n", "# BEGIN dropsync\n"]
    );
    assert_eq!(managed.suffix, ["# END dropsync\n", "# trailing comment\n"]);
}

#[rstest]
fn split_matches_markers_ignoring_surrounding_whitespace() {
    let content = format!("  {START}  \r\nold\r\n\t{END}\r\n");

    let managed =
        ManagedFile::split(&content, START, END).unwrap_or_else(|err| panic!("split: {err}"));

    assert_eq!(managed.prefix, [format!("  {START}  \r\n")]);
    assert_eq!(managed.suffix, [format!("\t{END}\r\n")]);
}

#[rstest]
fn splice_discards_everything_between_the_markers(instance: ResolvedInstance) {
    let content = file_with_region("Host stale\n    Hostname 1.2.3.4\n");
    let managed =
        ManagedFile::split(&content, START, END).unwrap_or_else(|err| panic!("split: {err}"));

    let output = managed.splice(std::slice::from_ref(&instance), "user");

    assert_eq!(
        output,
        format!(
            "Host gateway\n    Port 2222\n{START}\nHost do-prod\n    # web1\n    \
             Hostname 10.0.0.1\n    IdentityFile ~/.ssh/id_prod\n    User user\n{END}\n\
             # trailing comment\n"
        )
    );
}

#[rstest]
fn splice_with_no_instances_leaves_an_empty_region() {
    let content = file_with_region("stale\n");
    let managed =
        ManagedFile::split(&content, START, END).unwrap_or_else(|err| panic!("split: {err}"));

    let output = managed.splice(&[], "user");

    assert_eq!(output, file_with_region(""));
}

#[rstest]
fn splice_is_idempotent(instance: ResolvedInstance) {
    let content = file_with_region("whatever was here before\n");
    let managed =
        ManagedFile::split(&content, START, END).unwrap_or_else(|err| panic!("split: {err}"));
    let first = managed.splice(std::slice::from_ref(&instance), "user");

    let reparsed =
        ManagedFile::split(&first, START, END).unwrap_or_else(|err| panic!("re-split: {err}"));
    let second = reparsed.splice(std::slice::from_ref(&instance), "user");

    assert_eq!(first, second);
}

#[rstest]
fn split_preserves_crlf_terminators_outside_the_region(instance: ResolvedInstance) {
    let content = format!("Host gw\r\n{START}\r\nold\r\n{END}\r\ntail\r\n");
    let managed =
        ManagedFile::split(&content, START, END).unwrap_or_else(|err| panic!("split: {err}"));

    let output = managed.splice(std::slice::from_ref(&instance), "root");

    assert!(output.starts_with("Host gw\r\n"), "prefix terminators kept");
    assert!(output.ends_with("tail\r\n"), "suffix terminators kept");
}

#[rstest]
fn missing_start_marker_is_reported() {
    let err = ManagedFile::split("no markers here\n", START, END)
        .expect_err("split should fail");

    assert_eq!(
        err,
        RegionError::MarkersNotFound {
            start: START.to_owned(),
            end: END.to_owned(),
        }
    );
}

#[rstest]
fn missing_end_marker_is_reported() {
    let content = format!("{START}\nline\n");

    let err = ManagedFile::split(&content, START, END).expect_err("split should fail");

    assert_eq!(
        err,
        RegionError::EndMarkerMissing {
            end: END.to_owned(),
        }
    );
}

#[rstest]
fn reversed_markers_are_reported_as_out_of_order() {
    let content = format!("{END}\nline\n{START}\n");

    let err = ManagedFile::split(&content, START, END).expect_err("split should fail");

    assert_eq!(
        err,
        RegionError::MarkersOutOfOrder {
            start: START.to_owned(),
            end: END.to_owned(),
        }
    );
}

#[rstest]
fn file_without_trailing_newline_keeps_its_last_line() {
    let content = format!("{START}\nold\n{END}\nlast line without newline");
    let managed =
        ManagedFile::split(&content, START, END).unwrap_or_else(|err| panic!("split: {err}"));

    let output = managed.splice(&[], "user");

    assert!(output.ends_with("last line without newline"));
}
