//! Which collections migrate, and in which order.

use crate::domain::collections::Collection;

/// Legacy root collection `source` moves into the tenant-scoped `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionMigration {
    pub source: Collection,
    pub target: Collection,
}

impl CollectionMigration {
    #[must_use]
    pub const fn same(collection: Collection) -> Self {
        Self {
            source: collection,
            target: collection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    migrations: Vec<CollectionMigration>,
}

impl Default for MigrationPlan {
    /// Referenced collections first, so dependents validate against moved data.
    fn default() -> Self {
        Self::new(
            [
                Collection::Classes,
                Collection::Plans,
                Collection::Announcements,
                Collection::Payments,
                Collection::CheckIns,
                Collection::Evaluations,
                Collection::Graduations,
            ]
            .into_iter()
            .map(CollectionMigration::same)
            .collect(),
        )
    }
}

impl MigrationPlan {
    #[must_use]
    pub fn new(migrations: Vec<CollectionMigration>) -> Self {
        Self { migrations }
    }

    #[must_use]
    pub fn migrations(&self) -> &[CollectionMigration] {
        &self.migrations
    }

    /// The migration writing into `target`, if planned.
    #[must_use]
    pub fn find(&self, target: Collection) -> Option<CollectionMigration> {
        self.migrations
            .iter()
            .copied()
            .find(|migration| migration.target == target)
    }
}
