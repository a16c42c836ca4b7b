use super::errors::Forbidden;

/// Allows a mutation only when the acting user owns the resource.
///
/// Callers load the resource first so that a missing row surfaces as
/// not-found before ownership is ever considered.
pub fn authorize(resource_owner_id: i64, principal_id: i64) -> Result<(), Forbidden> {
    if resource_owner_id == principal_id {
        Ok(())
    } else {
        Err(Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_allowed() {
        assert_eq!(authorize(5, 5), Ok(()));
    }

    #[test]
    fn other_user_is_forbidden() {
        assert_eq!(authorize(5, 6), Err(Forbidden));
        assert_eq!(authorize(6, 5), Err(Forbidden));
    }
}
