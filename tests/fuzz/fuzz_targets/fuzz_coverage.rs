#![no_main]
use dotnet_reports::model::Coverage;
use dotnet_reports::parsers::{CoverageFormat, CoverageParser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the format, the rest is the report.
    let Some((&selector, report)) = data.split_first() else {
        return;
    };
    let format = CoverageFormat::ALL[selector as usize % CoverageFormat::ALL.len()];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.html");
    std::fs::write(&path, report).unwrap();

    // Parsers must not panic on any input.
    let _ = format.parser().parse(&path, &mut Coverage::new());
});
