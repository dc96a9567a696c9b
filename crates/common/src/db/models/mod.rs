//! SeaORM entity models
//!
//! Database entities for YaMDb

pub(crate) mod user;
pub(crate) mod category;
pub(crate) mod genre;
pub(crate) mod title;
pub(crate) mod genre_title;
pub(crate) mod review;
pub(crate) mod comment;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
    Role,
};

pub use category::{
    Entity as CategoryEntity,
    Model as Category,
    ActiveModel as CategoryActiveModel,
    Column as CategoryColumn,
};

pub use genre::{
    Entity as GenreEntity,
    Model as Genre,
    ActiveModel as GenreActiveModel,
    Column as GenreColumn,
};

pub use title::{
    Entity as TitleEntity,
    Model as Title,
    ActiveModel as TitleActiveModel,
    Column as TitleColumn,
};

pub use genre_title::{
    Entity as GenreTitleEntity,
    Model as GenreTitle,
    ActiveModel as GenreTitleActiveModel,
    Column as GenreTitleColumn,
};

pub use review::{
    Entity as ReviewEntity,
    Model as Review,
    ActiveModel as ReviewActiveModel,
    Column as ReviewColumn,
};

pub use comment::{
    Entity as CommentEntity,
    Model as Comment,
    ActiveModel as CommentActiveModel,
    Column as CommentColumn,
};
