#![no_main]

use buildstall::config::AnalysisConfig;
use buildstall::event_log::parse_events;
use buildstall::pipeline::Analysis;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Whatever decodes must also survive the full analysis
        if let Ok(events) = parse_events(input) {
            let _ = Analysis::run(&events, &AnalysisConfig::default());
        }
    }
});
