use std::collections::HashMap;

/// Resolved commit identity for a ClearCase user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// Lookup table from ClearCase user ids to display name and email.
/// Unmapped ids fall back to the id itself with a synthesized address.
#[derive(Debug, Clone)]
pub struct UserMap {
    entries: HashMap<String, User>,
    domain: String,
}

impl UserMap {
    /// Build from raw `id = Display Name <mail@host>` config entries.
    /// Entries without an address part map the whole value to the name.
    pub fn new(raw: &HashMap<String, String>, domain: &str) -> Self {
        let entries = raw
            .iter()
            .map(|(id, value)| (id.clone(), parse_entry(value, id, domain)))
            .collect();
        Self {
            entries,
            domain: domain.to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resolve(&self, id: &str) -> User {
        self.entries.get(id).cloned().unwrap_or_else(|| User {
            name: id.to_string(),
            email: format!("{id}@{}", self.domain),
        })
    }
}

fn parse_entry(value: &str, id: &str, domain: &str) -> User {
    match value.rfind('<') {
        Some(open) => {
            let name = value[..open].trim();
            let email = value[open + 1..].trim_end().trim_end_matches('>').trim();
            User {
                name: if name.is_empty() { id } else { name }.to_string(),
                email: email.to_string(),
            }
        }
        None => User {
            name: value.trim().to_string(),
            email: format!("{id}@{domain}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> UserMap {
        let raw = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        UserMap::new(&raw, "example.com")
    }

    #[test]
    fn test_resolve_full_entry() {
        let users = map(&[("amartin", "Alice Martin <alice@corp.example>")]);
        let user = users.resolve("amartin");
        assert_eq!(user.name, "Alice Martin");
        assert_eq!(user.email, "alice@corp.example");
    }

    #[test]
    fn test_resolve_name_only_entry() {
        let users = map(&[("bob", "Bob Jones")]);
        let user = users.resolve("bob");
        assert_eq!(user.name, "Bob Jones");
        assert_eq!(user.email, "bob@example.com");
    }

    #[test]
    fn test_resolve_unknown_id_falls_back() {
        let users = map(&[]);
        let user = users.resolve("carol");
        assert_eq!(user.name, "carol");
        assert_eq!(user.email, "carol@example.com");
    }
}
