//! User-facing text (French)

pub const LOOKUP_FIELDS_REQUIRED: &str = "Veuillez remplir le nom et le prénom.";
pub const LOOKUP_NOT_FOUND: &str = "Aucun invité trouvé avec ce nom et prénom.";
pub const LOOKUP_FAILED: &str = "Erreur lors de la recherche. Réessayez.";
pub const TABLE_UNASSIGNED: &str = "Non attribuée";

pub const NAME_REQUIRED: &str = "Le nom et le prénom sont obligatoires.";
pub const TABLE_INVALID: &str = "Le numéro de table doit être un entier positif.";
pub const ADD_FAILED: &str = "Erreur lors de l'ajout.";
pub const EDIT_FAILED: &str = "Erreur lors de la modification.";
pub const DELETE_CONFIRM: &str = "Êtes-vous sûr de vouloir supprimer cet invité ?";
pub const ROSTER_EMPTY: &str = "Aucun invité pour le moment.";
pub const ROSTER_EMPTY_HINT: &str = "Cliquez sur \"Ajouter un invité\" pour commencer.";

pub const INVALID_CREDENTIALS: &str = "Email ou mot de passe incorrect.";
pub const EMAIL_NOT_CONFIRMED: &str = "Veuillez confirmer votre email avant de vous connecter.";
pub const GENERIC_ERROR: &str = "Une erreur est survenue.";
pub const CHECK_EMAIL: &str = "Vérifiez votre email pour confirmer votre inscription.";
pub const INVALID_EMAIL: &str = "Adresse email invalide.";
pub const PASSWORD_TOO_SHORT: &str = "Le mot de passe doit contenir au moins 6 caractères.";

pub const LOADING: &str = "Chargement...";
pub const ACTION_RUNNING: &str = "Enregistrement en cours...";
pub const CONSOLE_BUSY: &str = "Une action est déjà en cours. Réessayez dans un instant.";

/// "12 invité(s) enregistré(s)"
pub fn guest_count(count: usize) -> String {
    format!("{} invité(s) enregistré(s)", count)
}
