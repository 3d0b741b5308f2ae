use std::str::FromStr;

use crate::uuid_id;

use super::CartError;

uuid_id!(CartId);
uuid_id!(ItemId);
uuid_id!(ProductId);
// Session ids are bearer tokens.
uuid_id!(SessionId, uuid::Uuid::new_v4);
uuid_id!(UserId);

impl ProductId {
    /// Parses a product id supplied by a client.
    pub fn parse(value: &str) -> Result<Self, CartError> {
        ProductId::from_str(value).map_err(|_| CartError::InvalidProductId(value.to_owned()))
    }
}

impl UserId {
    /// Parses a user id forwarded by the authentication layer.
    pub fn parse(value: &str) -> Result<Self, CartError> {
        UserId::from_str(value).map_err(|_| CartError::InvalidUserId(value.to_owned()))
    }
}
