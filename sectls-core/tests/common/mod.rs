//! Shared fixtures: fixed RSA test keys, a DER certificate builder, a
//! scripted handshake engine and an in-memory transport.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use num_bigint::BigUint;
use sectls_core::certificate_validator::{ChainVerifier, CrlList, TrustStore, VerifyFlags};
use sectls_core::connection::{Connection, HttpLayer, TerminationCode};
use sectls_core::error::{Error, ProtocolError, Result};
use sectls_core::extensions::Extensions;
use sectls_core::handshake::{HandshakeContext, HandshakeEngine, HandshakeOutcome, HandshakeStep};
use sectls_core::protocol::{CipherSuite, ContentType, MacAlgorithm};
use sectls_core::session::TlsSession;
use sectls_core::signature_verify::encode_digest_info;
use sectls_core::state::{Role, SecurityParameters};
use sectls_core::transport::Transport;
use sectls_core::Certificate;
use sectls_crypto::{CryptoProvider, HashAlgorithm, RecordProtection, RsaPublicKey};
use sectls_crypto_rustcrypto::RustCryptoProvider;

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A 1024-bit RSA test key (e = 65537).
#[derive(Debug)]
pub struct TestKey {
    n: &'static str,
    d: &'static str,
}

pub const ROOT_KEY: TestKey = TestKey {
    n: "cfbd1988d970e025209987d4266880756933dfd910b6da91ad34985b01280f4e\
        19868aa9eeb806b1a05ef59c7a9c4fb8b634c3c8591f9d90434361373682f019\
        b24414f980149923369ce70e08bcb9115ab1214dccc930ff548221f07eb8e086\
        7a851fdb8f521770b5ef7e287e0d358e74373aa1f6b598a8a864f949c7f2800f",
    d: "704557b68125a2ce0df74bd45949a31b51570ac48a66f86b40bbab178be1759c\
        14e984a9606dae9872febf28e98eeefaf9e63c655bdd5d4f693ad2207fe27615\
        c36585dfd45346507a7a2465298dabdabeacca3ce71d63deafbb8864d58b6aba\
        e1775ded429f1db10e155ff68b1279ca2bdd8338d58c0adf5ab01e725a4ffe51",
};

pub const INTERMEDIATE_KEY: TestKey = TestKey {
    n: "b7d79a212d4f240c68b882303249552c35d6fd21e1d703e10ecf5c4dcd62c07e\
        96216eff8453f850d6476ae989702a237a174c58e6e8366e7a3a8e7bf5fc17c8\
        f3f9dd125e2a2a3fc5230afe67af3d5065c3a850c4253a1b82696a0db4c2ea5a\
        518d246fea9d10dd85cabbe8895eb0da69080a3771c3d1da29f75558f37820b1",
    d: "b582d7989e259f4fe92d12cd07394430cc4fa1c98c33408f3a921d6e6bb46e9e\
        0d18a1810263edadd282dcda0b6a851056011ece3fdd51b0ae59964869cc26a6\
        01e023ac920c378e35d867df5dd84961ef87cc93d24fb5f3ab4593648e5240f4\
        0e7c474f4a64461f3a2a74f958c6f1fb8e0607bbd4c97f983b5d9d2a5e2b56e1",
};

pub const LEAF_KEY: TestKey = TestKey {
    n: "e8d91c5ebd2ecb588e7fb72dc9cb3af4e2566e6a9be4d62cca442d8ac1615735\
        69f8dbeafe205e130cc54bec85456e90127384970166c5e5d5b5385a1eb203c0\
        9da3b052186d31bcbdf37b6f561830d6c7cf63fc209a404451e1d9c67ba6d35a\
        75d2de09a977400dffb3147d974ff4debeac036bb56663bcdb6619cbfd023369",
    d: "a120f48fdeac4e0ce6f71c24745acd5e7e6dbf14c8f22eff69ac8a3355a46d7b\
        c9ec6b0a8f768882f8386354b5d8992cdb87d2bdc83b7d409185490c9be725ce\
        479e84411f1078195654bb3bbad7271452af1909c3ab1b398b880fbd9d4a6713\
        88dae57475b3c7f1b0cb2d4323cba7804e6d95535237e673df5144302308761d",
};

pub const ROGUE_KEY: TestKey = TestKey {
    n: "ac164e8928d8cf19e6875b0ba2d379fb482e70ebbbd23f73e4fc898e55ad75b3\
        bbf1b9e4aedf4f53e5f71e892d61ff3b67ea61293e0df99befc17497c0743210\
        e210e376979a4537e23bf570855d8ebceac171aa428e89c447834a987bb10dde\
        b5bde0aa88dd74973343da930eb56af1888c07295cb3c25ca753605d868217eb",
    d: "842d7611400097c24b21383b4dcba56beedb4cfca3fd2fa3b3048e1b778f8e52\
        894f77fb409e616e0dbaac07ad8611e6ed404774c8272fcc2871ad3e4a2275b8\
        e31014854071504cb2686f70a33bab3e51cd4b2796b55b5c0c5f60825d8a73cc\
        bb4f9b02f5c1bc25570746cf32f1263e14cd48c5a73bcc3c6cec436602a8cd01",
};

const PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

impl TestKey {
    pub fn modulus(&self) -> Vec<u8> {
        hex::decode(self.n).unwrap()
    }

    pub fn public(&self) -> RsaPublicKey {
        RsaPublicKey::new(&self.modulus(), &PUBLIC_EXPONENT)
    }

    /// Raw RSA private operation on an already padded block.
    pub fn sign_block(&self, block: &[u8]) -> Vec<u8> {
        let n = self.modulus();
        let d = hex::decode(self.d).unwrap();
        let m = BigUint::from_bytes_be(block);
        let s = m.modpow(&BigUint::from_bytes_be(&d), &BigUint::from_bytes_be(&n));
        let mut out = s.to_bytes_be();
        while out.len() < n.len() {
            out.insert(0, 0);
        }
        out
    }

    /// PKCS#1 v1.5 type-1 signature over an arbitrary payload.
    pub fn sign_payload(&self, payload: &[u8]) -> Vec<u8> {
        let k = self.modulus().len();
        let mut block = vec![0x00, 0x01];
        block.resize(k - payload.len() - 1, 0xff);
        block.push(0x00);
        block.extend_from_slice(payload);
        self.sign_block(&block)
    }

    /// PKCS#1 v1.5 signature of `data` with `hash`.
    pub fn sign(&self, hash: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        let digest = RustCryptoProvider::new().digest(hash, data).unwrap();
        self.sign_payload(&encode_digest_info(hash, &digest))
    }

    /// DER SubjectPublicKeyInfo.
    pub fn spki(&self) -> Vec<u8> {
        let mut modulus = self.modulus();
        if modulus[0] & 0x80 != 0 {
            modulus.insert(0, 0);
        }
        let rsa_key = tlv(
            0x30,
            &[tlv(0x02, &modulus), tlv(0x02, &PUBLIC_EXPONENT)].concat(),
        );
        let mut bits = vec![0x00];
        bits.extend_from_slice(&rsa_key);
        tlv(
            0x30,
            &[algorithm(&[1, 2, 840, 113549, 1, 1, 1]), tlv(0x03, &bits)].concat(),
        )
    }
}

// ---------------------------------------------------------------------------
// DER
// ---------------------------------------------------------------------------

pub fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = contents.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xff {
        out.extend_from_slice(&[0x81, len as u8]);
    } else {
        assert!(len <= 0xffff);
        out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(contents);
    out
}

pub fn oid(arcs: &[u32]) -> Vec<u8> {
    let mut body = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        let mut chunk = vec![(arc & 0x7f) as u8];
        let mut rest = arc >> 7;
        while rest > 0 {
            chunk.insert(0, 0x80 | (rest & 0x7f) as u8);
            rest >>= 7;
        }
        body.extend_from_slice(&chunk);
    }
    tlv(0x06, &body)
}

pub fn algorithm(arcs: &[u32]) -> Vec<u8> {
    tlv(0x30, &[oid(arcs), vec![0x05, 0x00]].concat())
}

/// `CN=<cn>` distinguished name.
pub fn name(cn: &str) -> Vec<u8> {
    let atv = [oid(&[2, 5, 4, 3]), tlv(0x0c, cn.as_bytes())].concat();
    tlv(0x30, &tlv(0x31, &tlv(0x30, &atv)))
}

fn signature_oid(hash: HashAlgorithm) -> &'static [u32] {
    match hash {
        HashAlgorithm::Md2 => &[1, 2, 840, 113549, 1, 1, 2],
        HashAlgorithm::Md5 => &[1, 2, 840, 113549, 1, 1, 4],
        HashAlgorithm::Sha1 => &[1, 2, 840, 113549, 1, 1, 5],
        HashAlgorithm::Sha224 => &[1, 2, 840, 113549, 1, 1, 14],
        HashAlgorithm::Sha256 => &[1, 2, 840, 113549, 1, 1, 11],
        HashAlgorithm::Sha384 => &[1, 2, 840, 113549, 1, 1, 12],
        HashAlgorithm::Sha512 => &[1, 2, 840, 113549, 1, 1, 13],
    }
}

/// Builds signed X.509 certificates.
#[derive(Debug, Clone)]
pub struct CertBuilder {
    subject: String,
    issuer: String,
    key: &'static TestKey,
    version: u8,
    serial: Vec<u8>,
    ca: Option<bool>,
    hash: HashAlgorithm,
}

impl CertBuilder {
    /// Version 3 end-entity certificate with SHA-256.
    pub fn new(subject: &str, issuer: &str, key: &'static TestKey) -> Self {
        Self {
            subject: subject.into(),
            issuer: issuer.into(),
            key,
            version: 3,
            serial: vec![0x01],
            ca: None,
            hash: HashAlgorithm::Sha256,
        }
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn serial(mut self, serial: &[u8]) -> Self {
        self.serial = serial.to_vec();
        self
    }

    /// Add a basicConstraints extension with the given CA bit.
    pub fn ca(mut self, ca: bool) -> Self {
        self.ca = Some(ca);
        self
    }

    pub fn hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    pub fn tbs(&self) -> Vec<u8> {
        let mut body = Vec::new();
        if self.version > 1 {
            body.extend(tlv(0xa0, &tlv(0x02, &[self.version - 1])));
        }
        body.extend(tlv(0x02, &self.serial));
        body.extend(algorithm(signature_oid(self.hash)));
        body.extend(name(&self.issuer));
        body.extend(tlv(
            0x30,
            &[
                tlv(0x17, b"200101000000Z"),
                tlv(0x17, b"400101000000Z"),
            ]
            .concat(),
        ));
        body.extend(name(&self.subject));
        body.extend(self.key.spki());

        if let Some(ca) = self.ca {
            let constraints = if ca {
                tlv(0x30, &tlv(0x01, &[0xff]))
            } else {
                tlv(0x30, &[])
            };
            let extension = tlv(
                0x30,
                &[
                    oid(&[2, 5, 29, 19]),
                    tlv(0x01, &[0xff]),
                    tlv(0x04, &constraints),
                ]
                .concat(),
            );
            body.extend(tlv(0xa3, &tlv(0x30, &extension)));
        }

        tlv(0x30, &body)
    }

    /// Sign with `signer` and return the DER certificate.
    pub fn sign(&self, signer: &TestKey) -> Vec<u8> {
        let tbs = self.tbs();
        let signature = signer.sign(self.hash, &tbs);
        let mut bits = vec![0x00];
        bits.extend_from_slice(&signature);
        tlv(
            0x30,
            &[tbs, algorithm(signature_oid(self.hash)), tlv(0x03, &bits)].concat(),
        )
    }

    /// Sign and decode.
    pub fn build(&self, signer: &TestKey) -> Certificate {
        Certificate::from_der(&self.sign(signer)).unwrap()
    }
}

/// Self-signed version 3 CA "Test Root".
pub fn root() -> Certificate {
    CertBuilder::new("Test Root", "Test Root", &ROOT_KEY)
        .serial(&[0x10])
        .ca(true)
        .build(&ROOT_KEY)
}

/// CA "Test Intermediate" issued by the root.
pub fn intermediate() -> Certificate {
    CertBuilder::new("Test Intermediate", "Test Root", &INTERMEDIATE_KEY)
        .serial(&[0x20])
        .ca(true)
        .build(&ROOT_KEY)
}

/// End-entity "www.example.test" issued by the intermediate.
pub fn leaf() -> Certificate {
    CertBuilder::new("www.example.test", "Test Intermediate", &LEAF_KEY)
        .serial(&[0x77])
        .ca(false)
        .build(&INTERMEDIATE_KEY)
}

pub fn trust_root() -> TrustStore {
    TrustStore::from(vec![root()])
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// XOR "cipher" so tests can see protection being installed.
#[derive(Debug, Clone, Copy)]
pub struct XorProtection(pub u8);

impl RecordProtection for XorProtection {
    fn seal(&mut self, _content_type: u8, plaintext: &[u8]) -> sectls_crypto::Result<Vec<u8>> {
        Ok(plaintext.iter().map(|b| b ^ self.0).collect())
    }

    fn open(&mut self, _content_type: u8, ciphertext: &[u8]) -> sectls_crypto::Result<Vec<u8>> {
        Ok(ciphertext.iter().map(|b| b ^ self.0).collect())
    }

    fn name(&self) -> &'static str {
        "XOR"
    }
}

/// One scripted response of [`ScriptedEngine`].
#[derive(Debug)]
pub enum Step {
    /// Reply with a handshake record and wait for more
    Reply(Vec<u8>),
    /// Decode the record as an extension block and answer with ours
    Extensions,
    /// Treat the record as a Certificate message and verify it
    VerifyPeer,
    /// Finish, installing XOR protection with this key
    Finish(u8),
    /// Fail the handshake
    Fail,
}

/// Handshake engine that follows a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    script: VecDeque<Step>,
    seen: Arc<Mutex<Vec<(ContentType, Vec<u8>)>>>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            seen: Arc::default(),
        }
    }

    /// Records the engine has been fed.
    pub fn seen(&self) -> Arc<Mutex<Vec<(ContentType, Vec<u8>)>>> {
        Arc::clone(&self.seen)
    }
}

pub fn negotiated(role: Role) -> SecurityParameters {
    SecurityParameters {
        cipher_suite: CipherSuite::RSA_WITH_AES_128_CBC_SHA,
        mac_algorithm: MacAlgorithm::HmacSha1,
        ..SecurityParameters::initial(role)
    }
}

impl HandshakeEngine for ScriptedEngine {
    fn step(
        &mut self,
        ctx: &mut HandshakeContext<'_>,
        content_type: ContentType,
        fragment: &[u8],
    ) -> Result<HandshakeStep> {
        self.seen
            .lock()
            .unwrap()
            .push((content_type, fragment.to_vec()));

        match self.script.pop_front() {
            Some(Step::Reply(reply)) => {
                ctx.send(ContentType::Handshake, &reply);
                Ok(HandshakeStep::InProgress)
            },
            Some(Step::Extensions) => {
                let role = ctx.role();
                ctx.extensions().receive_block(role, fragment)?;
                let reply = ctx.extensions().send_block(role)?;
                ctx.send(ContentType::Handshake, &reply);
                Ok(HandshakeStep::InProgress)
            },
            Some(Step::VerifyPeer) => {
                let outcome = ctx.verify_peer_certificates(fragment)?;
                if !outcome.is_success() {
                    return Err(Error::ProtocolError(ProtocolError::BadCertificate));
                }
                Ok(HandshakeStep::InProgress)
            },
            Some(Step::Finish(key)) => {
                ctx.send(ContentType::ChangeCipherSpec, &[1]);
                Ok(HandshakeStep::Complete(Box::new(HandshakeOutcome {
                    parameters: negotiated(ctx.role()),
                    read_protection: Box::new(XorProtection(key)),
                    write_protection: Box::new(XorProtection(key)),
                })))
            },
            Some(Step::Fail) | None => Err(Error::HandshakeFailure("scripted failure".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport and HTTP layer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Pipe {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    peer_closed: bool,
    shutdowns: usize,
}

/// In-memory transport; clones share the same pipe.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    pipe: Arc<Mutex<Pipe>>,
}

impl MemoryTransport {
    pub fn push(&self, bytes: &[u8]) {
        self.pipe.lock().unwrap().inbound.extend(bytes.iter().copied());
    }

    pub fn push_record(&self, content_type: u8, body: &[u8]) {
        self.push(&record(content_type, body));
    }

    pub fn close_peer(&self) {
        self.pipe.lock().unwrap().peer_closed = true;
    }

    /// Drain what the connection has written, split into records.
    pub fn take_records(&self) -> Vec<(u8, Vec<u8>)> {
        let written = std::mem::take(&mut self.pipe.lock().unwrap().outbound);
        parse_records(&written)
    }

    pub fn shutdowns(&self) -> usize {
        self.pipe.lock().unwrap().shutdowns
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.pipe.lock().unwrap();
        if pipe.inbound.is_empty() {
            return if pipe.peer_closed {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }
        let n = buf.len().min(pipe.inbound.len());
        for (dst, src) in buf.iter_mut().zip(pipe.inbound.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pipe.lock().unwrap().outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.pipe.lock().unwrap().shutdowns += 1;
        Ok(())
    }
}

pub fn record(content_type: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![content_type, 3, 3, (body.len() >> 8) as u8, body.len() as u8];
    out.extend_from_slice(body);
    out
}

pub fn parse_records(mut data: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut records = Vec::new();
    while data.len() >= 5 {
        let len = u16::from_be_bytes([data[3], data[4]]) as usize;
        records.push((data[0], data[5..5 + len].to_vec()));
        data = &data[5 + len..];
    }
    records
}

/// HTTP layer that records everything it is told.
#[derive(Debug, Default)]
pub struct RecordingHttp {
    pub received: Vec<u8>,
    pub handshake_completed: bool,
    pub terminations: Vec<TerminationCode>,
}

impl HttpLayer for RecordingHttp {
    fn on_handshake_complete(&mut self, _params: &SecurityParameters) {
        self.handshake_completed = true;
    }

    fn on_data(&mut self, data: &[u8]) -> Result<()> {
        self.received.extend_from_slice(data);
        Ok(())
    }

    fn on_terminate(&mut self, code: TerminationCode) {
        self.terminations.push(code);
    }
}

pub type TestConnection = Connection<MemoryTransport, RecordingHttp>;

/// Server connection over a fresh in-memory pipe.
pub fn server_connection(engine: ScriptedEngine, timeout: Duration) -> (TestConnection, MemoryTransport) {
    server_connection_with(engine, Extensions::new(), None, timeout)
}

pub fn server_connection_with(
    engine: ScriptedEngine,
    extensions: Extensions,
    verifier: Option<ChainVerifier>,
    timeout: Duration,
) -> (TestConnection, MemoryTransport) {
    init_tracing();
    let transport = MemoryTransport::default();
    let session = TlsSession::new(
        Role::Server,
        Box::new(engine),
        Arc::new(RustCryptoProvider::new()),
        verifier,
        extensions,
    );
    let conn = Connection::new(transport.clone(), session, RecordingHttp::default(), timeout);
    (conn, transport)
}

pub fn verifier(store: TrustStore, flags: VerifyFlags) -> ChainVerifier {
    ChainVerifier::new(
        Arc::new(RustCryptoProvider::new()),
        Arc::new(store),
        Arc::new(CrlList::new()),
        flags,
    )
}
