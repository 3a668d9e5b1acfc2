use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("principal `{0}` is unknown to this registry")]
    UnknownPrincipal(uuid::Uuid),

    #[error("`{actor}` is not a granter of `{target}` and is not the kernel")]
    NotGranter { actor: uuid::Uuid, target: uuid::Uuid },

    #[error("no security profile registered under role `{0}`")]
    UnknownProfile(String),
}
