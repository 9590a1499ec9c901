use xdrsigma_cortex::XqlBackend;
use xdrsigma_pipeline::{PipelineError, Result};
use xdrsigma_rule::{SigmaRule, parse_sigma_yaml};

pub fn parse_rule(yaml: &str) -> SigmaRule {
    let mut collection = parse_sigma_yaml(yaml).expect("rule should parse");
    assert!(collection.errors.is_empty(), "{:?}", collection.errors);
    collection.rules.remove(0)
}

pub fn convert(yaml: &str) -> Result<String> {
    XqlBackend::new().convert_rule(&parse_rule(yaml))
}

pub fn convert_ok(yaml: &str) -> String {
    match convert(yaml) {
        Ok(query) => query,
        Err(err) => panic!("conversion failed: {err}"),
    }
}

pub fn convert_err(yaml: &str) -> PipelineError {
    match convert(yaml) {
        Ok(query) => panic!("expected failure, got query: {query}"),
        Err(err) => err,
    }
}
