use anyhow::{Context, Result, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use clap::{Parser, Subcommand};
mod auth;
use keyforge::{
    HashAlgorithm, KeyAlgorithm, KeyPair, Signature, Signer, Storage, SymmetricCipher,
    Verification, compute_mac, read_private_key, read_public_key, verify_mac, write_private_key,
    write_public_key,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const PRIVATE_KEY_FILE: &str = "privatekey.pem";
const PUBLIC_KEY_FILE: &str = "pubkey.pub";

#[derive(Debug, Parser)]
#[command(name = "keyforge")]
#[command(version, about = "Generate keys, sign, verify, encrypt and authenticate messages.")]
struct Cli {
    /// Digest used for signing, key derivation and MACs
    #[arg(long, global = true, default_value_t = HashAlgorithm::Sha512)]
    hash: HashAlgorithm,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generates a key pair (privatekey.pem / pubkey.pub)
    #[command(arg_required_else_help = true)]
    Generate {
        /// rsa or ecdsa
        algorithm: KeyAlgorithm,

        /// RSA modulus size
        #[arg(long, default_value_t = keyforge::crypto::RSA_DEFAULT_BITS)]
        bits: usize,

        /// Directory the key files are written to
        #[arg(long, value_name = "DIR", env = "KEYFORGE_KEY_DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Overwrite existing key files
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Signs a file and prints the base64 signature
    #[command(arg_required_else_help = true)]
    Sign {
        /// Private key (RSA or EC PEM)
        #[arg(long, value_name = "PATH")]
        key: PathBuf,
        file: PathBuf,
    },

    /// Verifies a base64 signature over a file
    #[command(arg_required_else_help = true)]
    Verify {
        /// Public key PEM
        #[arg(long, value_name = "PATH")]
        key: PathBuf,

        /// Family of the public key: rsa or ecdsa
        #[arg(long)]
        algorithm: KeyAlgorithm,

        #[arg(long)]
        signature: String,
        file: PathBuf,
    },

    /// Encrypts a file with a secret
    #[command(arg_required_else_help = true)]
    Encrypt {
        input: PathBuf,
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Decrypts a file produced by `encrypt`
    #[command(arg_required_else_help = true)]
    Decrypt {
        input: PathBuf,
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Computes, or checks with --tag, an HMAC over a file keyed by the secret
    #[command(arg_required_else_help = true)]
    Mac {
        file: PathBuf,
        #[arg(long)]
        tag: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn generate(algorithm: KeyAlgorithm, bits: usize, out_dir: &Path, force: bool) -> Result<()> {
    let private_path = out_dir.join(PRIVATE_KEY_FILE);
    let public_path = out_dir.join(PUBLIC_KEY_FILE);

    if !force {
        for path in [&private_path, &public_path] {
            if Storage::new(path.clone()).exists() {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
        }
    }

    let pair = match algorithm {
        KeyAlgorithm::Rsa => KeyPair::generate_rsa(bits)?,
        KeyAlgorithm::Ecdsa => KeyPair::generate_ecdsa()?,
    };

    write_private_key(&private_path, pair.private_key())
        .with_context(|| format!("failed to write {}", private_path.display()))?;
    write_public_key(&public_path, pair.public_key())
        .with_context(|| format!("failed to write {}", public_path.display()))?;

    println!("Generated {algorithm} key pair in {}", out_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    match args.command {
        Commands::Generate {
            algorithm,
            bits,
            out_dir,
            force,
        } => generate(algorithm, bits, &out_dir, force)?,

        Commands::Sign { key, file } => {
            let key = read_private_key(&key)
                .with_context(|| format!("failed to load private key {}", key.display()))?;
            let message = read_input(&file)?;
            let signature = Signer::new(args.hash).sign(&message, &key)?;
            println!("{}", STANDARD.encode(signature.as_bytes()));
        }

        Commands::Verify {
            key,
            algorithm,
            signature,
            file,
        } => {
            let key = read_public_key(&key, algorithm)
                .with_context(|| format!("failed to load public key {}", key.display()))?;
            let signature = STANDARD
                .decode(signature.trim())
                .context("signature is not valid base64")?;
            let message = read_input(&file)?;

            match Signer::new(args.hash).verify(&message, &Signature::from(signature), &key) {
                Verification::Accept => println!("signature valid"),
                Verification::Reject(reason) => bail!("signature invalid ({reason:?})"),
            }
        }

        Commands::Encrypt { input, out } => {
            let secret = auth::read_secret()?;
            let plaintext = read_input(&input)?;
            let payload = SymmetricCipher::new(args.hash).encrypt(&plaintext, secret.as_bytes())?;
            Storage::new(out.clone())
                .save(&payload)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("encrypted {} -> {}", input.display(), out.display());
        }

        Commands::Decrypt { input, out } => {
            let secret = auth::read_secret()?;
            let payload = read_input(&input)?;
            let plaintext = SymmetricCipher::new(args.hash).decrypt(&payload, secret.as_bytes())?;
            Storage::new(out.clone())
                .restricted(true)
                .save(&plaintext)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("decrypted {} -> {}", input.display(), out.display());
        }

        Commands::Mac { file, tag } => {
            let secret = auth::read_secret()?;
            let message = read_input(&file)?;
            match tag {
                Some(tag) => {
                    let tag = STANDARD.decode(tag.trim()).context("tag is not valid base64")?;
                    if verify_mac(&message, secret.as_bytes(), &tag, args.hash) {
                        println!("tag valid");
                    } else {
                        bail!("tag invalid");
                    }
                }
                None => {
                    let tag = compute_mac(&message, secret.as_bytes(), args.hash)?;
                    println!("{}", STANDARD.encode(tag));
                }
            }
        }
    }

    Ok(())
}
