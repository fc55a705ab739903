//! User and role models

use std::fmt;

use serde::{Deserialize, Serialize};

/// A permission granting actions on a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub resource: Resource,
    pub actions: Vec<Action>,
}

impl Permission {
    fn new(resource: Resource, actions: &[Action]) -> Self {
        Self {
            resource,
            actions: actions.to_vec(),
        }
    }

    /// `resource:action` keys as carried in access tokens
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.actions
            .iter()
            .map(move |action| permission_key(self.resource, *action))
    }
}

/// Resources that can be accessed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Company,
    Branch,
    Customer,
    Product,
    PricingTier,
    Invoice,
    Payment,
    PaymentVerification,
    Production,
    Report,
    User,
    Role,
}

impl Resource {
    pub const ALL: [Resource; 12] = [
        Resource::Company,
        Resource::Branch,
        Resource::Customer,
        Resource::Product,
        Resource::PricingTier,
        Resource::Invoice,
        Resource::Payment,
        Resource::PaymentVerification,
        Resource::Production,
        Resource::Report,
        Resource::User,
        Resource::Role,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Company => "company",
            Resource::Branch => "branch",
            Resource::Customer => "customer",
            Resource::Product => "product",
            Resource::PricingTier => "pricing_tier",
            Resource::Invoice => "invoice",
            Resource::Payment => "payment",
            Resource::PaymentVerification => "payment_verification",
            Resource::Production => "production",
            Resource::Report => "report",
            Resource::User => "user",
            Resource::Role => "role",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Export,
    Verify,
    Approve,
    Skip,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Export => "export",
            Action::Verify => "verify",
            Action::Approve => "approve",
            Action::Skip => "skip",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the `resource:action` key used in tokens and the permissions table
pub fn permission_key(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource, action)
}

const CRUD: &[Action] = &[Action::View, Action::Create, Action::Edit, Action::Delete];
const VIEW: &[Action] = &[Action::View];

/// Default roles created for new companies
pub fn default_roles() -> Vec<(&'static str, Vec<Permission>)> {
    use Action::*;

    vec![
        (
            "owner",
            Resource::ALL
                .iter()
                .map(|resource| {
                    Permission::new(
                        *resource,
                        &[View, Create, Edit, Delete, Export, Verify, Approve, Skip],
                    )
                })
                .collect(),
        ),
        (
            "manager",
            vec![
                Permission::new(Resource::Branch, VIEW),
                Permission::new(Resource::Customer, CRUD),
                Permission::new(Resource::Product, CRUD),
                Permission::new(Resource::PricingTier, CRUD),
                Permission::new(Resource::Invoice, &[View, Create, Edit, Export]),
                Permission::new(Resource::Payment, &[View, Create]),
                Permission::new(Resource::PaymentVerification, &[View, Create, Verify]),
                Permission::new(Resource::Production, &[View, Create, Edit, Approve, Skip]),
                Permission::new(Resource::Report, &[View, Export]),
            ],
        ),
        (
            "production",
            vec![
                Permission::new(Resource::Invoice, VIEW),
                Permission::new(Resource::Product, VIEW),
                Permission::new(Resource::Production, &[View, Edit]),
            ],
        ),
        (
            "accountant",
            vec![
                Permission::new(Resource::Customer, VIEW),
                Permission::new(Resource::Invoice, &[View, Export]),
                Permission::new(Resource::Payment, &[View, Create]),
                Permission::new(Resource::PaymentVerification, &[View, Verify]),
                Permission::new(Resource::Report, &[View, Export]),
            ],
        ),
        (
            "viewer",
            [
                Resource::Customer,
                Resource::Product,
                Resource::PricingTier,
                Resource::Invoice,
                Resource::Production,
            ]
            .iter()
            .map(|resource| Permission::new(*resource, VIEW))
            .collect(),
        ),
    ]
}

/// Every `resource:action` pair the platform knows about
pub fn all_permission_keys() -> Vec<String> {
    let mut keys: Vec<String> = default_roles()
        .into_iter()
        .flat_map(|(_, perms)| perms)
        .flat_map(|perm| perm.keys().collect::<Vec<_>>())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_can_do_everything() {
        let (name, perms) = &default_roles()[0];
        assert_eq!(*name, "owner");
        assert_eq!(perms.len(), Resource::ALL.len());
        assert!(perms.iter().all(|p| p.actions.len() == 8));
    }

    #[test]
    fn production_role_cannot_approve() {
        let roles = default_roles();
        let (_, perms) = roles.iter().find(|(n, _)| *n == "production").unwrap();
        let keys: Vec<String> = perms.iter().flat_map(|p| p.keys().collect::<Vec<_>>()).collect();
        assert!(keys.contains(&"production:edit".to_string()));
        assert!(!keys.contains(&"production:approve".to_string()));
    }

    #[test]
    fn keys_use_snake_case_resources() {
        assert_eq!(
            permission_key(Resource::PaymentVerification, Action::Verify),
            "payment_verification:verify"
        );
        assert!(all_permission_keys().contains(&"pricing_tier:create".to_string()));
    }
}
