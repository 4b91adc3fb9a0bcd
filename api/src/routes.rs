use crate::resource::{Action, ResourceDescriptor};

/// The todos resource, served at `/todos`.
pub fn todos() -> ResourceDescriptor {
    ResourceDescriptor::new("todos", "/todos").only(&[
        Action::Index,
        Action::Show,
        Action::Create,
        Action::Update,
        Action::Destroy,
    ])
}
