//! Access rules for the API
//!
//! Rules are pure predicates over the request method, the requester and,
//! for object-level checks, the resource's author. They compose into
//! [`Policy`] trees with `All` / `Any`, and every endpoint picks one of the
//! prebuilt policies below.

use crate::db::models::{Comment, Review, User};
use crate::errors::{AppError, Result};
use axum::http::Method;

/// Resources that record who wrote them
pub trait Authored {
    fn author_id(&self) -> i32;
}

impl Authored for Review {
    fn author_id(&self) -> i32 {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i32 {
        self.author_id
    }
}

/// GET, HEAD and OPTIONS never mutate state
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// A single access predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Safe methods for anyone, anything else needs a requester
    AuthenticatedOrReadOnly,
    Authenticated,
    /// Object writes only by the resource's author
    Author,
    /// Object writes only by moderators
    Moderator,
    /// Writes only by admins, on collections and objects alike
    Admin,
    /// Admin role or staff flag, whatever the method
    AdminOnly,
}

impl Rule {
    fn allows(&self, method: &Method, requester: Option<&User>, author_id: Option<i32>) -> bool {
        let safe = is_safe_method(method);
        match self {
            Rule::AuthenticatedOrReadOnly => safe || requester.is_some(),
            Rule::Authenticated => requester.is_some(),
            Rule::Author => match author_id {
                None => true,
                Some(author) => safe || requester.is_some_and(|u| u.id == author),
            },
            Rule::Moderator => match author_id {
                None => true,
                Some(_) => safe || requester.is_some_and(User::is_moderator),
            },
            Rule::Admin => safe || requester.is_some_and(User::is_admin),
            Rule::AdminOnly => requester.is_some_and(|u| u.is_admin() || u.is_staff),
        }
    }
}

/// Composition of rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    Rule(Rule),
    All(Vec<Policy>),
    Any(Vec<Policy>),
}

impl Policy {
    /// Categories, genres and titles: read by anyone, written by admins
    pub fn catalog() -> Self {
        Policy::All(vec![
            Policy::Rule(Rule::AuthenticatedOrReadOnly),
            Policy::Rule(Rule::Admin),
        ])
    }

    /// Reviews and comments: written by their author, moderators or admins
    pub fn authored_content() -> Self {
        Policy::All(vec![
            Policy::Rule(Rule::AuthenticatedOrReadOnly),
            Policy::Any(vec![
                Policy::Rule(Rule::Author),
                Policy::Rule(Rule::Moderator),
                Policy::Rule(Rule::Admin),
            ]),
        ])
    }

    /// Account administration
    pub fn user_admin() -> Self {
        Policy::All(vec![
            Policy::Rule(Rule::Authenticated),
            Policy::Rule(Rule::AdminOnly),
        ])
    }

    /// The requester's own profile
    pub fn self_service() -> Self {
        Policy::Rule(Rule::Authenticated)
    }

    fn allows(&self, method: &Method, requester: Option<&User>, author_id: Option<i32>) -> bool {
        match self {
            Policy::Rule(rule) => rule.allows(method, requester, author_id),
            Policy::All(parts) => parts.iter().all(|p| p.allows(method, requester, author_id)),
            Policy::Any(parts) => parts.iter().any(|p| p.allows(method, requester, author_id)),
        }
    }

    /// Whether the requester may perform `method` on the collection
    pub fn has_permission(&self, method: &Method, requester: Option<&User>) -> bool {
        self.allows(method, requester, None)
    }

    /// Whether the requester may perform `method` on a specific resource
    pub fn has_object_permission(
        &self,
        method: &Method,
        requester: Option<&User>,
        resource: &dyn Authored,
    ) -> bool {
        self.has_permission(method, requester)
            && self.allows(method, requester, Some(resource.author_id()))
    }

    pub fn check(&self, method: &Method, requester: Option<&User>) -> Result<()> {
        deny_unless(self.has_permission(method, requester), requester)
    }

    pub fn check_object(
        &self,
        method: &Method,
        requester: Option<&User>,
        resource: &dyn Authored,
    ) -> Result<()> {
        deny_unless(self.has_object_permission(method, requester, resource), requester)
    }
}

/// Anonymous requesters get 401 so they know to authenticate; known ones 403
fn deny_unless(allowed: bool, requester: Option<&User>) -> Result<()> {
    if allowed {
        return Ok(());
    }
    match requester {
        None => Err(AppError::Unauthorized {
            message: "Authentication credentials were not provided".to_string(),
        }),
        Some(_) => Err(AppError::Forbidden {
            message: "You do not have permission to perform this action".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use chrono::Utc;

    fn user(id: i32, role: Role) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            role,
            first_name: None,
            last_name: None,
            bio: None,
            is_active: true,
            is_staff: false,
            date_joined: Utc::now().into(),
        }
    }

    struct Owned(i32);

    impl Authored for Owned {
        fn author_id(&self) -> i32 {
            self.0
        }
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::HEAD));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::PATCH));
        assert!(!is_safe_method(&Method::DELETE));
    }

    #[test]
    fn test_catalog_policy() {
        let policy = Policy::catalog();
        let admin = user(1, Role::Admin);
        let moderator = user(2, Role::Moderator);

        assert!(policy.has_permission(&Method::GET, None));
        assert!(policy.has_permission(&Method::POST, Some(&admin)));
        assert!(!policy.has_permission(&Method::POST, Some(&moderator)));
        assert!(!policy.has_permission(&Method::POST, None));
    }

    #[test]
    fn test_authored_content_policy() {
        let policy = Policy::authored_content();
        let author = user(1, Role::User);
        let stranger = user(2, Role::User);
        let moderator = user(3, Role::Moderator);
        let admin = user(4, Role::Admin);
        let review = Owned(author.id);

        // Any authenticated user may create
        assert!(policy.has_permission(&Method::POST, Some(&stranger)));
        assert!(!policy.has_permission(&Method::POST, None));

        for method in [Method::PATCH, Method::PUT, Method::DELETE] {
            assert!(policy.has_object_permission(&method, Some(&author), &review));
            assert!(policy.has_object_permission(&method, Some(&moderator), &review));
            assert!(policy.has_object_permission(&method, Some(&admin), &review));
            assert!(!policy.has_object_permission(&method, Some(&stranger), &review));
            assert!(!policy.has_object_permission(&method, None, &review));
        }

        assert!(policy.has_object_permission(&Method::GET, None, &review));
    }

    #[test]
    fn test_user_admin_policy() {
        let policy = Policy::user_admin();
        let mut staff = user(1, Role::User);
        staff.is_staff = true;

        assert!(policy.has_permission(&Method::GET, Some(&user(2, Role::Admin))));
        assert!(policy.has_permission(&Method::DELETE, Some(&staff)));
        assert!(!policy.has_permission(&Method::GET, Some(&user(3, Role::Moderator))));
        assert!(!policy.has_permission(&Method::GET, None));
    }

    #[test]
    fn test_denial_status() {
        let policy = Policy::catalog();

        let anonymous = policy.check(&Method::POST, None).unwrap_err();
        assert!(matches!(anonymous, AppError::Unauthorized { .. }));

        let reader = user(1, Role::User);
        let known = policy.check(&Method::POST, Some(&reader)).unwrap_err();
        assert!(matches!(known, AppError::Forbidden { .. }));

        let stranger = user(2, Role::User);
        let err = Policy::authored_content()
            .check_object(&Method::DELETE, Some(&stranger), &Owned(1))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }
}
