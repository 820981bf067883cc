use crate::handler::Response;
use anyhow::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutMode {
    Pretty,
    Compact,
}

impl OutMode {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "compact" => OutMode::Compact,
            _ => OutMode::Pretty,
        }
    }
}

pub fn render(response: &Response, mode: OutMode) -> Result<String> {
    Ok(match mode {
        OutMode::Pretty => serde_json::to_string_pretty(response)?,
        OutMode::Compact => serde_json::to_string(response)?,
    })
}

pub fn emit_stdout(response: &Response, mode: OutMode) -> Result<()> {
    println!("{}", render(response, mode)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_mode_defaults_to_pretty() {
        assert_eq!(OutMode::parse("COMPACT"), OutMode::Compact);
        assert_eq!(OutMode::parse("whatever"), OutMode::Pretty);
    }

    #[test]
    fn compact_output_uses_status_code_casing() {
        let resp = Response::ok(json!({ "total_size": 1 }));
        let line = render(&resp, OutMode::Compact).unwrap();
        assert_eq!(line, r#"{"statusCode":200,"body":{"total_size":1}}"#);
    }
}
