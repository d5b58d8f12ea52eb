use serde_json::{Map, Value, json};

/// Per-response metadata: the elapsed duration sampled by the dispatcher and
/// the formatting flag in effect when the response is built.
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeMeta {
    pub duration_secs: f64,
    pub pretty: bool,
}

/// Success envelope: the `rpc` metadata object followed by the handler's
/// fields.
pub fn success(meta: EnvelopeMeta, fields: Map<String, Value>) -> String {
    let mut root = Map::with_capacity(fields.len() + 1);
    root.insert("rpc".to_string(), rpc_meta(meta));
    root.extend(fields);
    to_text(meta.pretty, Value::Object(root))
}

/// Error envelope: the `rpc` metadata object plus a single `error` field.
/// Success fields and error text never appear together.
pub fn failure(meta: EnvelopeMeta, message: &str) -> String {
    let mut root = Map::with_capacity(2);
    root.insert("rpc".to_string(), rpc_meta(meta));
    root.insert("error".to_string(), Value::String(message.to_string()));
    to_text(meta.pretty, Value::Object(root))
}

fn rpc_meta(meta: EnvelopeMeta) -> Value {
    json!({ "duration": meta.duration_secs })
}

fn to_text(pretty: bool, value: Value) -> String {
    let encoded = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    // String-keyed JSON values always encode.
    encoded.unwrap_or_else(|_| r#"{"rpc":{},"error":"response encoding failed"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> EnvelopeMeta {
        EnvelopeMeta {
            duration_secs: 0.25,
            pretty: false,
        }
    }

    #[test]
    fn success_carries_rpc_and_fields() {
        let mut fields = Map::new();
        fields.insert("pretty".to_string(), Value::Bool(true));
        let text = success(meta(), fields);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["rpc"]["duration"], 0.25);
        assert_eq!(value["pretty"], true);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn failure_has_only_error_beside_rpc() {
        let text = failure(meta(), "scene error: scene not found: 'x'");
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["rpc"]["duration"], 0.25);
        assert_eq!(value["error"], "scene error: scene not found: 'x'");
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn empty_success_is_just_metadata() {
        let text = success(meta(), Map::new());
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn pretty_flag_switches_formatting() {
        let m = EnvelopeMeta {
            duration_secs: 0.0,
            pretty: true,
        };
        assert!(success(m, Map::new()).contains('\n'));
        assert!(!success(meta(), Map::new()).contains('\n'));
    }
}
