/// Operator accounts allowed to sign in to the HTTP shell.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    users: Vec<Credentials>,
}

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: String,
}

impl UserRegistry {
    /// Parse `user:password,user:password,...`, skipping entries without a password field.
    pub fn load(spec: &str) -> Self {
        let users = spec
            .split(',')
            .filter_map(|entry| {
                let mut fields = entry.split(':');
                let username = fields.next()?;
                let password = fields.next()?;
                Some(Credentials { username: username.to_string(), password: password.to_string() })
            })
            .collect();
        Self { users }
    }

    pub fn validate(&self, username: &str, password: &str) -> bool {
        self.users.iter().any(|user| user.username == username && user.password == password)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_exact_pairs_only() {
        let users = UserRegistry::load("admin:hunter2,ops:letmein,broken");
        assert_eq!(users.len(), 2);
        assert!(users.validate("admin", "hunter2"));
        assert!(users.validate("ops", "letmein"));
        assert!(!users.validate("admin", "letmein"));
        assert!(!users.validate("Admin", "hunter2"));
        assert!(!users.validate("broken", ""));
    }

    #[test]
    fn empty_spec_accepts_nobody() {
        let users = UserRegistry::load("");
        assert!(users.is_empty());
        assert!(!users.validate("", ""));
    }
}
