//! Message catalog: every protocol code, its name, category and content
//! shape.
//!
//! The catalog is closed. Codes are grouped in disjoint numeric ranges,
//! one per [`Category`]; unassigned values (for instance 80..=99 and
//! 230..=255) are reserved and never valid on the wire.

use serde::{Deserialize, Serialize};

/// Code category, one per reserved numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Generic and error signaling (10..=49).
    Generic,
    /// Parameter change (50..=69).
    ParameterChange,
    /// Polarisation recovery (70..=79).
    PolarisationRecovery,
    /// Identification and identification failure (100..=119).
    Identification,
    /// Initialization (120..=139).
    Initialization,
    /// Quantum information exchange (140..=159).
    QuantumExchange,
    /// Parameter estimation (160..=179).
    ParameterEstimation,
    /// Error correction (180..=199).
    ErrorCorrection,
    /// Privacy amplification (200..=219).
    PrivacyAmplification,
    /// End of frame and end of communication (220..=229).
    Termination,
}

impl Category {
    /// Category owning the numeric range `value` falls in, if any.
    pub fn of(value: u8) -> Option<Self> {
        match value {
            10..=49 => Some(Self::Generic),
            50..=69 => Some(Self::ParameterChange),
            70..=79 => Some(Self::PolarisationRecovery),
            100..=119 => Some(Self::Identification),
            120..=139 => Some(Self::Initialization),
            140..=159 => Some(Self::QuantumExchange),
            160..=179 => Some(Self::ParameterEstimation),
            180..=199 => Some(Self::ErrorCorrection),
            200..=219 => Some(Self::PrivacyAmplification),
            220..=229 => Some(Self::Termination),
            _ => None,
        }
    }
}

/// Whether a message carries structured content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentShape {
    /// The message never carries content.
    Empty,
    /// Content is allowed but not required.
    Optional,
    /// Content must be present.
    Required,
}

/// Catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeInfo {
    /// The code.
    pub code: Code,
    /// Canonical upper-case name.
    pub name: &'static str,
    /// Category.
    pub category: Category,
    /// Content shape.
    pub content: ContentShape,
}

impl CodeInfo {
    /// True if the message may carry content.
    pub fn carries_content(&self) -> bool {
        self.content != ContentShape::Empty
    }
}

/// Lookup failure for a value absent from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unknown code: {0}")]
pub struct UnknownCode(pub u8);

macro_rules! catalog {
    ($( $category:ident { $( $(#[$doc:meta])* $variant:ident = $value:literal, $name:literal, $shape:ident; )* } )*) => {
        /// Protocol message codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Code {
            $( $( $(#[$doc])* $variant = $value, )* )*
        }

        /// The full catalog, ordered by numeric code.
        pub const CATALOG: &[(Code, &str, ContentShape)] = &[
            $( $( (Code::$variant, $name, ContentShape::$shape), )* )*
        ];

        impl Code {
            /// Convert from wire format.
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $( $( $value => Some(Self::$variant), )* )*
                    _ => None,
                }
            }

            /// Canonical upper-case name.
            pub fn name(self) -> &'static str {
                match self {
                    $( $( Self::$variant => $name, )* )*
                }
            }

            /// Category of this code.
            pub fn category(self) -> Category {
                match self {
                    $( $( Self::$variant => Category::$category, )* )*
                }
            }

            /// Content shape.
            pub fn content_shape(self) -> ContentShape {
                match self {
                    $( $( Self::$variant => ContentShape::$shape, )* )*
                }
            }
        }
    };
}

catalog! {
    // Generic (10-49)
    Generic {
        /// The received code is not in the catalog.
        UnknownCommand = 10, "UNKNOWN_COMMAND", Required;
        /// The received code is not legal in the current phase.
        UnexpectedCommand = 11, "UNEXPECTED_COMMAND", Required;
        /// The content of the received message was invalid.
        InvalidContent = 12, "INVALID_CONTENT", Optional;
        /// The received response was invalid.
        InvalidResponse = 13, "INVALID_RESPONSE", Optional;
        /// Acknowledge an invalid response notification.
        InvalidResponseAck = 14, "INVALID_RESPONSE_ACK", Empty;
        /// Abort the current frame.
        Abort = 15, "ABORT", Optional;
        /// Acknowledge an abort.
        AbortAck = 16, "ABORT_ACK", Empty;
        /// Authentication of the previous message failed.
        AuthenticationInvalid = 17, "AUTHENTICATION_INVALID", Empty;
    }

    // Parameter change (50-69)
    ParameterChange {
        /// Request a parameter change.
        ChangeParameterRequest = 50, "CHANGE_PARAMETER_REQUEST", Required;
        /// The parameter was changed.
        ParameterChanged = 51, "PARAMETER_CHANGED", Optional;
        /// The parameter is unknown.
        ParameterUnknown = 52, "PARAMETER_UNKNOWN", Optional;
        /// The requested value is invalid.
        ParameterInvalidValue = 53, "PARAMETER_INVALID_VALUE", Optional;
        /// The parameter was not changed.
        ParameterUnchanged = 54, "PARAMETER_UNCHANGED", Optional;
    }

    // Polarisation recovery (70-79)
    PolarisationRecovery {
        /// Request emission of the polarisation recovery sequence.
        RequestPolarisationRecovery = 70, "REQUEST_POLARISATION_RECOVERY", Empty;
        /// Polarisation recovery sequence enabled.
        PolarisationRecoveryAck = 71, "POLARISATION_RECOVERY_ACK", Empty;
        /// Request the end of the polarisation recovery sequence.
        EndPolarisationRecovery = 72, "END_POLARISATION_RECOVERY", Empty;
        /// Polarisation recovery sequence stopped.
        PolarisationRecoveryEnded = 73, "POLARISATION_RECOVERY_ENDED", Empty;
    }

    // Identification (100-119)
    Identification {
        /// Start (or restart) identification.
        IdentificationRequest = 100, "IDENTIFICATION_REQUEST", Required;
        /// Answer to an identification request.
        IdentificationResponse = 101, "IDENTIFICATION_RESPONSE", Required;
        /// Protocol versions are incompatible.
        InvalidQosstVersion = 102, "INVALID_QOSST_VERSION", Optional;
    }

    // Initialization (120-139)
    Initialization {
        /// Request the start of a new frame.
        InitializationRequest = 120, "INITIALIZATION_REQUEST", Required;
        /// Frame configuration accepted.
        InitializationAccepted = 121, "INITIALIZATION_ACCEPTED", Empty;
        /// Frame configuration denied.
        InitializationDenied = 122, "INITIALIZATION_DENIED", Optional;
        /// Counter-proposal of a configuration.
        InitializationProposal = 123, "INITIALIZATION_PROPOSAL", Required;
        /// Request the peer configuration.
        InitializationRequestConfig = 124, "INITIALIZATION_REQUEST_CONFIG", Empty;
        /// Configuration sent in answer.
        InitializationConfig = 125, "INITIALIZATION_CONFIG", Required;
    }

    // Quantum information exchange (140-159)
    QuantumExchange {
        /// Request the start of the quantum information exchange.
        QieRequest = 140, "QIE_REQUEST", Empty;
        /// Quantum information is ready to be sent.
        QieReady = 141, "QIE_READY", Empty;
        /// Trigger the emission.
        QieTrigger = 142, "QIE_TRIGGER", Empty;
        /// Emission has started.
        QieEmissionStarted = 143, "QIE_EMISSION_STARTED", Empty;
        /// Acquisition has ended.
        QieAcquisitionEnded = 144, "QIE_ACQUISITION_ENDED", Optional;
        /// End of the quantum information exchange.
        QieEnded = 145, "QIE_ENDED", Empty;
    }

    // Parameter estimation (160-179)
    ParameterEstimation {
        /// Request symbols at the given indices.
        PeSymbolsRequest = 160, "PE_SYMBOLS_REQUEST", Required;
        /// Requested symbols.
        PeSymbolsResponse = 161, "PE_SYMBOLS_RESPONSE", Required;
        /// Symbols could not be produced.
        PeSymbolsError = 162, "PE_SYMBOLS_ERROR", Optional;
        /// Request the average photon number.
        PeNphotonRequest = 163, "PE_NPHOTON_REQUEST", Empty;
        /// Average photon number.
        PeNphotonResponse = 164, "PE_NPHOTON_RESPONSE", Required;
        /// Estimation finished, estimated parameters attached.
        PeFinished = 165, "PE_FINISHED", Required;
        /// Estimated parameters approved.
        PeApproved = 166, "PE_APPROVED", Empty;
        /// Estimated parameters denied, the frame is aborted.
        PeDenied = 167, "PE_DENIED", Optional;
    }

    // Error correction (180-199)
    ErrorCorrection {
        /// Start error correction.
        EcInitialization = 180, "EC_INITIALIZATION", Optional;
        /// Ready for error correction.
        EcReady = 181, "EC_READY", Empty;
        /// Error correction refused.
        EcDenied = 182, "EC_DENIED", Optional;
        /// Error correction block.
        EcBlock = 183, "EC_BLOCK", Required;
        /// Block acknowledged.
        EcBlockAck = 184, "EC_BLOCK_ACK", Empty;
        /// Block could not be processed.
        EcBlockError = 185, "EC_BLOCK_ERROR", Optional;
        /// Remaining data.
        EcRemaining = 186, "EC_REMAINING", Required;
        /// Remaining data acknowledged.
        EcRemainingAck = 187, "EC_REMAINING_ACK", Empty;
        /// Remaining data could not be processed.
        EcRemainingError = 188, "EC_REMAINING_ERROR", Optional;
        /// Verification of the corrected key.
        EcVerification = 189, "EC_VERIFICATION", Required;
        /// Verification succeeded.
        EcVerificationSuccess = 190, "EC_VERIFICATION_SUCCESS", Empty;
        /// Verification failed, the frame is aborted.
        EcVerificationFail = 191, "EC_VERIFICATION_FAIL", Optional;
    }

    // Privacy amplification (200-219)
    PrivacyAmplification {
        /// Request privacy amplification.
        PaRequest = 200, "PA_REQUEST", Optional;
        /// Privacy amplification succeeded.
        PaSuccess = 201, "PA_SUCCESS", Empty;
        /// Privacy amplification failed, the frame is aborted.
        PaError = 202, "PA_ERROR", Optional;
    }

    // Frame and communication termination (220-229)
    Termination {
        /// End the current frame.
        FrameEnded = 220, "FRAME_ENDED", Empty;
        /// Frame end acknowledged.
        FrameEndedAck = 221, "FRAME_ENDED_ACK", Empty;
        /// Graceful disconnection.
        Disconnection = 222, "DISCONNECTION", Empty;
        /// Disconnection acknowledged.
        DisconnectionAck = 223, "DISCONNECTION_ACK", Empty;
    }
}

impl Code {
    /// Convert to wire format.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Full catalog entry.
    pub fn info(self) -> CodeInfo {
        CodeInfo {
            code: self,
            name: self.name(),
            category: self.category(),
            content: self.content_shape(),
        }
    }
}

impl TryFrom<u8> for Code {
    type Error = UnknownCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(UnknownCode(value))
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.to_u8())
    }
}

/// Look up a wire value in the catalog.
pub fn lookup(value: u8) -> Result<CodeInfo, UnknownCode> {
    Code::try_from(value).map(Code::info)
}
