//! Erreurs du moteur de recommandation.

use marksix_db::models::{Region, Strategy};
use thiserror::Error;

/// Échecs internes d'échantillonnage, absorbés par la chaîne de repli.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("pool insuffisant : {requested} numéros demandés, {available} disponibles")]
    InsufficientPool { requested: usize, available: usize },

    #[error("aucun signal de fréquence dans la fenêtre d'historique")]
    NoFrequencySignal,
}

/// Échecs de la stratégie `ai`, toujours remontés à l'appelant.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("impossible d'extraire 6 numéros + 1 spécial de la réponse")]
    Parse,

    #[error("service de génération indisponible : {0}")]
    Transport(String),

    #[error("service de génération non configuré (clé API manquante)")]
    NotConfigured,
}

/// Échecs d'une passe d'ajustement, consignés sans interrompre le cycle.
#[derive(Debug, Error)]
pub enum Error {
    #[error("erreur de stockage : {0}")]
    Store(#[from] anyhow::Error),

    #[error("échec de persistance de la configuration {region}/{strategy} : {source}")]
    ConfigPersistence {
        region: Region,
        strategy: Strategy,
        #[source]
        source: anyhow::Error,
    },
}
