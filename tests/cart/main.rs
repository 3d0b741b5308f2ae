mod cart_api;
mod router;
mod test_utils;
