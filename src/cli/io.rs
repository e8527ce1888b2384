//! Plain-text output for CLI commands

use std::io::Write;

use super::errors::CliResult;

/// Write `(METHOD, path)` rows as an aligned two-column table.
pub fn write_routes<W: Write>(out: &mut W, routes: &[(String, String)]) -> CliResult<()> {
    let width = routes
        .iter()
        .map(|(method, _)| method.len())
        .max()
        .unwrap_or(0);
    for (method, path) in routes {
        writeln!(out, "{:<width$}  {}", method, path, width = width)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_are_aligned() {
        let routes = vec![
            ("GET".to_string(), "/users".to_string()),
            ("DELETE".to_string(), "/post/{id}".to_string()),
        ];
        let mut out = Vec::new();
        write_routes(&mut out, &routes).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "GET     /users\nDELETE  /post/{id}\n");
    }
}
