//! Static collection registry.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use thiserror::Error;

use crate::{domain::tenants::TenantId, store::CollectionPath};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("collection `{0}` is not registered")]
pub struct UnknownCollection(pub String);

/// Logical collections known to the data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// User identities (global).
    Users,

    /// Academy registry (global). Academies are deactivated, never deleted.
    Academies,

    /// Pending invitations to join an academy (global).
    Invitations,

    Classes,
    Plans,
    Payments,
    CheckIns,
    Evaluations,
    Graduations,
    Announcements,
}

/// "The value of `field` must name an existing record of `target`."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceConstraint {
    pub field: &'static str,
    pub target: Collection,
}

/// Static description of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Physical collection name.
    pub name: &'static str,

    /// Tenant-isolated collections live under `tenant/{tenantId}/`.
    pub isolated: bool,

    /// Whether records may be deleted through the data layer.
    pub deletable: bool,

    pub required_fields: &'static [&'static str],
    pub references: &'static [ReferenceConstraint],
}

const fn reference(field: &'static str, target: Collection) -> ReferenceConstraint {
    ReferenceConstraint { field, target }
}

const USERS: CollectionSpec = CollectionSpec {
    name: "users",
    isolated: false,
    deletable: true,
    required_fields: &["email", "role"],
    references: &[],
};

const ACADEMIES: CollectionSpec = CollectionSpec {
    name: "academies",
    isolated: false,
    deletable: false,
    required_fields: &["name"],
    references: &[],
};

const INVITATIONS: CollectionSpec = CollectionSpec {
    name: "invitations",
    isolated: false,
    deletable: true,
    required_fields: &["email", "academyId"],
    references: &[],
};

const CLASSES: CollectionSpec = CollectionSpec {
    name: "classes",
    isolated: true,
    deletable: true,
    required_fields: &["name"],
    references: &[reference("instructorId", Collection::Users)],
};

const PLANS: CollectionSpec = CollectionSpec {
    name: "plans",
    isolated: true,
    deletable: true,
    required_fields: &["name", "price"],
    references: &[],
};

const PAYMENTS: CollectionSpec = CollectionSpec {
    name: "payments",
    isolated: true,
    deletable: true,
    required_fields: &["studentId", "amount"],
    references: &[
        reference("studentId", Collection::Users),
        reference("planId", Collection::Plans),
    ],
};

const CHECK_INS: CollectionSpec = CollectionSpec {
    name: "checkIns",
    isolated: true,
    deletable: true,
    required_fields: &["studentId"],
    references: &[
        reference("studentId", Collection::Users),
        reference("classId", Collection::Classes),
    ],
};

const EVALUATIONS: CollectionSpec = CollectionSpec {
    name: "evaluations",
    isolated: true,
    deletable: true,
    required_fields: &["studentId"],
    references: &[
        reference("studentId", Collection::Users),
        reference("instructorId", Collection::Users),
    ],
};

const GRADUATIONS: CollectionSpec = CollectionSpec {
    name: "graduations",
    isolated: true,
    deletable: true,
    required_fields: &["studentId", "belt"],
    references: &[
        reference("studentId", Collection::Users),
        reference("instructorId", Collection::Users),
    ],
};

const ANNOUNCEMENTS: CollectionSpec = CollectionSpec {
    name: "announcements",
    isolated: true,
    deletable: true,
    required_fields: &["title"],
    references: &[reference("authorId", Collection::Users)],
};

impl Collection {
    /// Every registered collection.
    pub const ALL: [Self; 10] = [
        Self::Users,
        Self::Academies,
        Self::Invitations,
        Self::Classes,
        Self::Plans,
        Self::Payments,
        Self::CheckIns,
        Self::Evaluations,
        Self::Graduations,
        Self::Announcements,
    ];

    #[must_use]
    pub const fn spec(self) -> &'static CollectionSpec {
        match self {
            Self::Users => &USERS,
            Self::Academies => &ACADEMIES,
            Self::Invitations => &INVITATIONS,
            Self::Classes => &CLASSES,
            Self::Plans => &PLANS,
            Self::Payments => &PAYMENTS,
            Self::CheckIns => &CHECK_INS,
            Self::Evaluations => &EVALUATIONS,
            Self::Graduations => &GRADUATIONS,
            Self::Announcements => &ANNOUNCEMENTS,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.spec().name
    }

    #[must_use]
    pub const fn is_isolated(self) -> bool {
        self.spec().isolated
    }

    /// Root-level path: the home of global collections and of legacy,
    /// tenant-less copies of isolated ones.
    #[must_use]
    pub fn root_path(self) -> CollectionPath {
        CollectionPath::root(self.as_str())
    }

    /// Path of this collection inside a tenant namespace.
    #[must_use]
    pub fn tenant_path(self, tenant: &TenantId) -> CollectionPath {
        CollectionPath::tenant(tenant, self.as_str())
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == name)
            .ok_or_else(|| UnknownCollection(name.to_string()))
    }
}
