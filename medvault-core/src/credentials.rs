use std::env;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::{Error, Result};

pub const MONGODB_URI: &str = "MONGODB_URI";
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_KEY_REGION: &str = "AWS_KEY_REGION";
pub const AWS_KEY_ARN: &str = "AWS_KEY_ARN";
pub const CRYPT_SHARED_LIB_PATH: &str = "CRYPT_SHARED_LIB_PATH";

/// Connection string and KMS credentials for the encryption-aware clients.
///
/// The AWS secret key never appears in debug output; it is exposed only while
/// rendering the driver's KMS provider table.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub mongodb_uri: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: SecretString,
    pub aws_key_region: String,
    pub aws_key_arn: String,
    pub crypt_shared_lib_path: Option<PathBuf>,
}

impl Credentials {
    /// Loads credentials from the process environment.
    ///
    /// Reports every missing variable in one error instead of failing on the
    /// first, so a fresh deployment can be fixed in a single pass.
    pub fn from_env() -> Result<Self> {
        fn require(name: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
            match env::var(name) {
                Ok(value) if !value.trim().is_empty() => Some(value),
                _ => {
                    missing.push(name);
                    None
                }
            }
        }

        let mut missing = Vec::new();
        let mongodb_uri = require(MONGODB_URI, &mut missing);
        let aws_access_key_id = require(AWS_ACCESS_KEY_ID, &mut missing);
        let aws_secret_access_key = require(AWS_SECRET_ACCESS_KEY, &mut missing);
        let aws_key_region = require(AWS_KEY_REGION, &mut missing);
        let aws_key_arn = require(AWS_KEY_ARN, &mut missing);

        let (
            Some(mongodb_uri),
            Some(aws_access_key_id),
            Some(aws_secret_access_key),
            Some(aws_key_region),
            Some(aws_key_arn),
        ) = (
            mongodb_uri,
            aws_access_key_id,
            aws_secret_access_key,
            aws_key_region,
            aws_key_arn,
        )
        else {
            return Err(Error::MissingCredentials { names: missing });
        };

        let crypt_shared_lib_path = env::var(CRYPT_SHARED_LIB_PATH)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            mongodb_uri,
            aws_access_key_id,
            aws_secret_access_key: SecretString::new(aws_secret_access_key),
            aws_key_region,
            aws_key_arn,
            crypt_shared_lib_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL: [&str; 6] = [
        MONGODB_URI,
        AWS_ACCESS_KEY_ID,
        AWS_SECRET_ACCESS_KEY,
        AWS_KEY_REGION,
        AWS_KEY_ARN,
        CRYPT_SHARED_LIB_PATH,
    ];

    fn clear_env() {
        // SAFETY: tests touching the process environment run serially.
        unsafe {
            for name in ALL {
                env::remove_var(name);
            }
        }
    }

    fn populate_env() {
        // SAFETY: tests touching the process environment run serially.
        unsafe {
            env::set_var(MONGODB_URI, "mongodb://localhost:27017");
            env::set_var(AWS_ACCESS_KEY_ID, "AKIAEXAMPLE");
            env::set_var(AWS_SECRET_ACCESS_KEY, "secret");
            env::set_var(AWS_KEY_REGION, "us-east-1");
            env::set_var(AWS_KEY_ARN, "arn:aws:kms:us-east-1:0:key/example");
        }
    }

    #[test]
    #[serial]
    fn reports_all_missing_variables_at_once() {
        clear_env();
        let err = Credentials::from_env().expect_err("credentials should be missing");
        match err {
            Error::MissingCredentials { names } => {
                assert_eq!(
                    names,
                    vec![
                        MONGODB_URI,
                        AWS_ACCESS_KEY_ID,
                        AWS_SECRET_ACCESS_KEY,
                        AWS_KEY_REGION,
                        AWS_KEY_ARN,
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[serial]
    fn loads_with_optional_shared_lib_absent() {
        clear_env();
        populate_env();
        let credentials = Credentials::from_env().expect("credentials");
        assert_eq!(credentials.mongodb_uri, "mongodb://localhost:27017");
        assert!(credentials.crypt_shared_lib_path.is_none());
    }

    #[test]
    #[serial]
    fn blank_values_count_as_missing() {
        clear_env();
        populate_env();
        // SAFETY: serial test.
        unsafe {
            env::set_var(AWS_KEY_ARN, "   ");
        }
        let err = Credentials::from_env().expect_err("blank arn should be rejected");
        match err {
            Error::MissingCredentials { names } => assert_eq!(names, vec![AWS_KEY_ARN]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[serial]
    fn picks_up_shared_lib_path() {
        clear_env();
        populate_env();
        // SAFETY: serial test.
        unsafe {
            env::set_var(CRYPT_SHARED_LIB_PATH, "/opt/mongo_crypt_v1.so");
        }
        let credentials = Credentials::from_env().expect("credentials");
        assert_eq!(
            credentials.crypt_shared_lib_path,
            Some(PathBuf::from("/opt/mongo_crypt_v1.so"))
        );
    }
}
