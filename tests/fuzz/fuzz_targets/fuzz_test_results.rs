#![no_main]
use dotnet_reports::model::UnitTestResults;
use dotnet_reports::parsers::{TestResultsFormat, UnitTestResultsParser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, report)) = data.split_first() else {
        return;
    };
    let format = TestResultsFormat::ALL[selector as usize % TestResultsFormat::ALL.len()];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.xml");
    std::fs::write(&path, report).unwrap();

    // Parsers must not panic on any input.
    let _ = format.parser().parse(&path, &mut UnitTestResults::new());
});
