//! Typed domain events.
//!
//! Site modules are identified by [`Module`] rather than by app-label
//! strings; subscribers match on [`DomainEvent`] variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChambaError;
use crate::models::{account::Account, profile::UserProfile, user_type::UserType};

/// A site module whose schema is migrated and which may own seed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Authentication,
    Blog,
    Contacto,
    Contenido,
    Cooperaciones,
    Donaciones,
    Eventos,
    Inicio,
    Nosotros,
    Participa,
    Proyectos,
    Tienda,
    Visitas,
}

impl Module {
    /// Startup order. Authentication runs first so the well-known user
    /// types exist before any content module is seeded.
    pub const ALL: [Module; 13] = [
        Module::Authentication,
        Module::Blog,
        Module::Contacto,
        Module::Contenido,
        Module::Cooperaciones,
        Module::Donaciones,
        Module::Eventos,
        Module::Inicio,
        Module::Nosotros,
        Module::Participa,
        Module::Proyectos,
        Module::Tienda,
        Module::Visitas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Authentication => "authentication",
            Module::Blog => "blog",
            Module::Contacto => "contacto",
            Module::Contenido => "contenido",
            Module::Cooperaciones => "cooperaciones",
            Module::Donaciones => "donaciones",
            Module::Eventos => "eventos",
            Module::Inicio => "inicio",
            Module::Nosotros => "nosotros",
            Module::Participa => "participa",
            Module::Proyectos => "proyectos",
            Module::Tienda => "tienda",
            Module::Visitas => "visitas",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = ChambaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ChambaError::Validation {
                message: format!("unknown module: {s}"),
            })
    }
}

#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// The module's schema is in place.
    Migrated { module: Module },
    AccountCreated { account: Account },
    UserTypeSaved { user_type: UserType, created: bool },
    ProfileSaved { profile: UserProfile },
}
