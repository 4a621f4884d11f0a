#[macro_export]
macro_rules! default_struct {
    (
        $(#[$struct_meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $type:ty $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$struct_meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $type
            ),*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field: $crate::default_struct!(@default $($default)?)
                    ),*
                }
            }
        }
    };
    (@default) => {
        Default::default()
    };
    (@default $expr:expr) => {
        $expr
    };
}

/// Splits a `;`-separated option list, dropping blank entries.
pub fn parse_options(input: &str) -> Vec<String> {
    input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts role ids from text containing role mentions (`<@&id>`) or bare
/// ids, keeping their order and dropping duplicates.
pub fn parse_role_ids(input: &str) -> Vec<u64> {
    let mut ids = Vec::new();
    for token in input.split(|c: char| c.is_whitespace() || c == ',') {
        let raw = token
            .strip_prefix("<@&")
            .and_then(|t| t.strip_suffix('>'))
            .unwrap_or(token);
        if let Ok(id) = raw.parse::<u64>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_split_on_semicolons() {
        assert_eq!(parse_options(" Oui ; Non;; "), vec!["Oui", "Non"]);
        assert!(parse_options("  ").is_empty());
    }

    #[test]
    fn role_mentions_and_ids_parse() {
        assert_eq!(parse_role_ids("<@&12> <@&34>, 56 <@&12> nope"), vec![12, 34, 56]);
        assert!(parse_role_ids("<@12>").is_empty());
    }

    default_struct! {
    #[derive(Debug)]
    struct Sample {
        pub limit: u64 = 20,
        pub name: String,
    }
    }

    #[test]
    fn default_struct_fills_defaults() {
        let sample = Sample::default();
        assert_eq!(sample.limit, 20);
        assert!(sample.name.is_empty());
    }
}
