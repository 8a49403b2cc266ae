//! Relation naming.
//!
//! A name is taken from the first source that yields one:
//!
//! 1. the owning table's annotations, under `name.belongsTo` / `name.m2o`,
//!    `name.hasMany` / `name.o2m` or `name.belongsToMany` / `name.m2m`;
//!    the value is a string or an object keyed by constraint name;
//! 2. a comma-separated constraint name `m2o_name,o2m_name,m2m_prefix`;
//! 3. derivation from column and table names.
//!
//! Many-to-many names from (1) and (2) are prefixes joined onto the target table
//! name. Under [`NamingStrategy::Complex`] derived names that collide within one
//! table's relation set get a discriminator; explicit names are left alone.

use super::model::{Cardinality, NamedRelation, Relation};
use crate::config::NamingStrategy;
use crate::graph::{ConstraintId, Database};
use std::collections::HashMap;

struct Candidate {
    relation: Relation,
    name: String,
    explicit: bool,
}

/// Name every relation in `relations` under `strategy`.
pub(crate) fn name_relations(
    db: &Database,
    relations: &[Relation],
    strategy: NamingStrategy,
) -> Vec<NamedRelation> {
    let mut candidates: Vec<Candidate> = relations.iter().map(|r| candidate(db, r)).collect();

    if strategy == NamingStrategy::Complex {
        disambiguate(db, &mut candidates);
    }

    candidates
        .into_iter()
        .map(|c| NamedRelation {
            relation: c.relation,
            name: c.name,
        })
        .collect()
}

/// Name a single relation without looking at its siblings.
pub(crate) fn relation_name(db: &Database, relation: &Relation) -> String {
    candidate(db, relation).name
}

fn candidate(db: &Database, relation: &Relation) -> Candidate {
    if let Some(name) = annotated_name(db, relation).or_else(|| hinted_name(db, relation)) {
        return Candidate {
            relation: *relation,
            name,
            explicit: true,
        };
    }
    Candidate {
        relation: *relation,
        name: derived_name(db, relation),
        explicit: false,
    }
}

/// Constraint whose name and annotations describe the relation.
fn naming_constraint(relation: &Relation) -> ConstraintId {
    match relation.cardinality {
        Cardinality::ManyToMany => relation.target_constraint.unwrap_or(relation.constraint),
        _ => relation.constraint,
    }
}

fn target_name<'a>(db: &'a Database, relation: &Relation) -> &'a str {
    &db.table(relation.target).name
}

fn annotated_name(db: &Database, relation: &Relation) -> Option<String> {
    let owner = match relation.cardinality {
        Cardinality::ManyToMany => relation.join_table?,
        _ => db.constraint(relation.constraint).table,
    };
    let names = db.table(owner).annotations.get("name")?;
    let keys: [&str; 2] = match relation.cardinality {
        Cardinality::ManyToOne => ["belongsTo", "m2o"],
        Cardinality::OneToMany => ["hasMany", "o2m"],
        Cardinality::ManyToMany => ["belongsToMany", "m2m"],
    };
    let constraint = &db.constraint(naming_constraint(relation)).name;

    let value = keys.iter().find_map(|key| {
        let entry = names.get(*key)?;
        entry
            .as_str()
            .or_else(|| entry.get(constraint.as_str()).and_then(|v| v.as_str()))
            .filter(|s| !s.is_empty())
    })?;

    Some(match relation.cardinality {
        Cardinality::ManyToMany => format!("{}_{}", value, target_name(db, relation)),
        _ => value.to_string(),
    })
}

fn hinted_name(db: &Database, relation: &Relation) -> Option<String> {
    let constraint = &db.constraint(naming_constraint(relation)).name;
    if !constraint.contains(',') {
        return None;
    }
    let position = match relation.cardinality {
        Cardinality::ManyToOne => 0,
        Cardinality::OneToMany => 1,
        Cardinality::ManyToMany => 2,
    };
    let segment = constraint
        .split(',')
        .map(str::trim)
        .nth(position)
        .filter(|s| !s.is_empty())?;

    Some(match relation.cardinality {
        Cardinality::ManyToMany => format!("{}_{}", segment, target_name(db, relation)),
        _ => segment.to_string(),
    })
}

fn derived_name(db: &Database, relation: &Relation) -> String {
    match relation.cardinality {
        Cardinality::ManyToOne => {
            let constraint = db.constraint(relation.constraint);
            let stripped = match constraint.columns.as_slice() {
                [single] => strip_id_suffix(&db.column(*single).name).map(str::to_string),
                _ => None,
            };
            stripped.unwrap_or_else(|| {
                format!(
                    "{}_{}",
                    db.config().relation_prefix,
                    target_name(db, relation)
                )
            })
        }
        Cardinality::OneToMany | Cardinality::ManyToMany => target_name(db, relation).to_string(),
    }
}

/// Strip a trailing `_id` (any case) or camel-case `Id` from a column name.
pub(crate) fn strip_id_suffix(name: &str) -> Option<&str> {
    let bytes = name.as_bytes();
    if bytes.len() > 3 && name.to_ascii_lowercase().ends_with("_id") {
        return Some(&name[..name.len() - 3]);
    }
    if bytes.len() > 2 && (name.ends_with("Id") || name.ends_with("ID")) {
        let stem = &name[..name.len() - 2];
        if stem
            .chars()
            .last()
            .is_some_and(|c| c.is_lowercase() || c.is_ascii_digit())
        {
            return Some(stem);
        }
    }
    None
}

fn collisions(candidates: &[Candidate]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for candidate in candidates {
        *counts.entry(candidate.name.clone()).or_default() += 1;
    }
    counts.retain(|_, count| *count > 1);
    counts
}

fn disambiguate(db: &Database, candidates: &mut [Candidate]) {
    // Round one: constraint name for direct relations, join table for many-to-many.
    let colliding = collisions(candidates);
    for candidate in candidates.iter_mut() {
        if candidate.explicit || !colliding.contains_key(&candidate.name) {
            continue;
        }
        let discriminator = match candidate.relation.join_table {
            Some(join) => db.table(join).name.as_str(),
            None => db.constraint(candidate.relation.constraint).name.as_str(),
        };
        candidate.name = format!("{}_{}", candidate.name, discriminator);
    }

    // Round two: several legs through the same join table.
    let colliding = collisions(candidates);
    for candidate in candidates.iter_mut() {
        if candidate.explicit || !colliding.contains_key(&candidate.name) {
            continue;
        }
        if let Some(target_constraint) = candidate.relation.target_constraint {
            candidate.name = format!("{}_{}", candidate.name, db.constraint(target_constraint).name);
        }
    }

    // Anything left gets a positional suffix.
    let colliding = collisions(candidates);
    let mut seen: HashMap<String, usize> = HashMap::new();
    for candidate in candidates.iter_mut() {
        if candidate.explicit || !colliding.contains_key(&candidate.name) {
            continue;
        }
        let count = seen.entry(candidate.name.clone()).or_default();
        *count += 1;
        if *count > 1 {
            candidate.name = format!("{}_{}", candidate.name, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_id_suffix() {
        assert_eq!(strip_id_suffix("owner_id"), Some("owner"));
        assert_eq!(strip_id_suffix("Owner_ID"), Some("Owner"));
        assert_eq!(strip_id_suffix("authorId"), Some("author"));
        assert_eq!(strip_id_suffix("author2ID"), Some("author2"));
        assert_eq!(strip_id_suffix("paid"), None);
        assert_eq!(strip_id_suffix("_id"), None);
        assert_eq!(strip_id_suffix("ID"), None);
        assert_eq!(strip_id_suffix("owner"), None);
    }
}
