pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::{login, token_create};

pub mod verify;
pub use self::verify::verify;

pub mod refresh;
pub use self::refresh::refresh;

pub mod logout;
pub use self::logout::logout;
