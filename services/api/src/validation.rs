//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("El nombre de usuario es obligatorio".to_string());
    }

    if username.len() < 3 {
        return Err("El nombre de usuario debe tener al menos 3 caracteres".to_string());
    }

    if username.len() > 32 {
        return Err("El nombre de usuario debe tener como maximo 32 caracteres".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "El nombre de usuario solo admite letras, numeros, puntos y guiones bajos".to_string(),
        );
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("La contrasena es obligatoria".to_string());
    }

    if password.len() < 8 {
        return Err("La contrasena debe tener al menos 8 caracteres".to_string());
    }

    if password.len() > 128 {
        return Err("La contrasena debe tener como maximo 128 caracteres".to_string());
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;

    for c in password.chars() {
        if c.is_ascii_uppercase() {
            has_upper = true;
        } else if c.is_ascii_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        }
    }

    if !has_upper {
        return Err("La contrasena debe contener al menos una mayuscula".to_string());
    }

    if !has_lower {
        return Err("La contrasena debe contener al menos una minuscula".to_string());
    }

    if !has_digit {
        return Err("La contrasena debe contener al menos un digito".to_string());
    }

    Ok(())
}

/// Validate a permission name of the form `<resource>:<action>`
pub fn validate_permission_name(name: &str) -> Result<(), String> {
    static PERMISSION_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PERMISSION_REGEX.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*:[a-z0-9]+(-[a-z0-9]+)*$")
            .expect("Failed to compile permission regex")
    });

    if !regex.is_match(name) {
        return Err(format!(
            "El permiso '{}' debe tener la forma recurso:accion en minusculas",
            name
        ));
    }

    Ok(())
}

/// Validate a role name
pub fn validate_role_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("El nombre del rol es obligatorio".to_string());
    }

    if name.chars().count() > 64 {
        return Err("El nombre del rol debe tener como maximo 64 caracteres".to_string());
    }

    Ok(())
}

/// Validate a catalog business code
pub fn validate_code(code: &str) -> Result<(), String> {
    if code.is_empty() {
        return Err("El codigo es obligatorio".to_string());
    }

    if code.len() > 50 {
        return Err("El codigo debe tener como maximo 50 caracteres".to_string());
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(format!(
            "El codigo '{}' solo admite letras, numeros, puntos y guiones",
            code
        ));
    }

    Ok(())
}

/// Validate a required free-text description
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.trim().is_empty() {
        return Err("La descripcion es obligatoria".to_string());
    }

    if description.chars().count() > 255 {
        return Err("La descripcion debe tener como maximo 255 caracteres".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("j.perez").is_ok());
        assert!(validate_username("admin_1").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("juan perez").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Activos2024").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("Ab1").is_err());
        assert!(validate_password("activos2024").is_err());
        assert!(validate_password("ACTIVOS2024").is_err());
        assert!(validate_password("ActivosFijos").is_err());
    }

    #[test]
    fn test_validate_permission_name() {
        assert!(validate_permission_name("direcciones-administrativas:listar").is_ok());
        assert!(validate_permission_name("ufv:exportar-pdf").is_ok());
        assert!(validate_permission_name("ufv").is_err());
        assert!(validate_permission_name("UFV:listar").is_err());
        assert!(validate_permission_name("ufv:listar:todo").is_err());
        assert!(validate_permission_name("ufv-:listar").is_err());
        assert!(validate_permission_name(":listar").is_err());
    }

    #[test]
    fn test_validate_role_name() {
        assert!(validate_role_name("AUXILIAR").is_ok());
        assert!(validate_role_name("   ").is_err());
        assert!(validate_role_name(&"R".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("05").is_ok());
        assert!(validate_code("UO-01.02.003").is_ok());
        assert!(validate_code("").is_err());
        assert!(validate_code("05 ").is_err());
        assert!(validate_code("05/1").is_err());
        assert!(validate_code(&"9".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("Distrito Sur").is_ok());
        assert!(validate_description("  ").is_err());
    }
}
