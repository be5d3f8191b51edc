/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw
/// config text.
///
/// Unresolvable variables without a fallback are left as-is so that the
/// parse error (or the literal value) points at the missing name.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: emit the remainder verbatim.
            result.push_str(&rest[start..]);
            return result;
        };
        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        let value = if name.is_empty() {
            None
        } else {
            lookup(name)
                .filter(|v| !v.is_empty())
                .or_else(|| fallback.map(str::to_string))
        };
        match value {
            Some(value) => result.push_str(&value),
            None => {
                result.push_str("${");
                result.push_str(body);
                result.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "COURIER_TOKEN" => Some("xoxb-1".to_string()),
            "COURIER_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("token = \"${COURIER_TOKEN}\"", lookup),
            "token = \"xoxb-1\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${COURIER_MISSING}", lookup),
            "${COURIER_MISSING}"
        );
    }

    #[test]
    fn uses_fallback_for_missing_or_empty() {
        assert_eq!(substitute_env_with("${COURIER_MISSING:-main}", lookup), "main");
        assert_eq!(substitute_env_with("${COURIER_EMPTY:-main}", lookup), "main");
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${OOPS", lookup), "a ${OOPS");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
