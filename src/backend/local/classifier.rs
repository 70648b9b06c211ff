use std::path::Path;
use std::sync::Arc;

use candle_core::{DType, Device, IndexOp, Result, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::{bert, xlm_roberta};
use serde::Deserialize;

/// Tensor-name prefixes under which BERT-style checkpoints store the encoder.
const ENCODER_PREFIXES: [&str; 2] = ["bert", "roberta"];

/// Encoder family, read from the `model_type` field of `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// BERT / MiniLM / RoBERTa checkpoints served by the candle BERT encoder.
    Bert,
    /// XLM-RoBERTa (bge-reranker family); positions start after the padding id.
    XlmRoberta,
}

#[derive(Deserialize)]
struct ModelTypeField {
    #[serde(default)]
    model_type: Option<String>,
}

impl Architecture {
    /// Detects the architecture from raw `config.json` text.
    ///
    /// A missing `model_type` falls back to [`Architecture::Bert`].
    pub fn from_config(raw_config: &str) -> Result<Self> {
        let field: ModelTypeField = serde_json::from_str(raw_config)
            .map_err(|e| candle_core::Error::Msg(format!("invalid config.json: {e}")))?;
        Ok(match field.model_type.as_deref() {
            Some("xlm-roberta") => Self::XlmRoberta,
            _ => Self::Bert,
        })
    }
}

/// Sequence-classification head on top of the `[CLS]` hidden state.
enum ClassifierHead {
    /// `classifier` linear projection (BERT / MiniLM cross-encoders).
    Linear(Linear),
    /// `classifier.dense` + tanh + `classifier.out_proj` (RoBERTa checkpoints).
    Roberta { dense: Linear, out_proj: Linear },
}

impl ClassifierHead {
    fn load(vb: VarBuilder, hidden_size: usize) -> Result<Self> {
        let vb = vb.pp("classifier");
        if vb.contains_tensor("out_proj.weight") {
            Ok(Self::Roberta {
                dense: candle_nn::linear(hidden_size, hidden_size, vb.pp("dense"))?,
                out_proj: candle_nn::linear(hidden_size, 1, vb.pp("out_proj"))?,
            })
        } else {
            Ok(Self::Linear(candle_nn::linear(hidden_size, 1, vb)?))
        }
    }

    fn forward(&self, cls: &Tensor) -> Result<Tensor> {
        match self {
            Self::Linear(classifier) => classifier.forward(cls),
            Self::Roberta { dense, out_proj } => out_proj.forward(&dense.forward(cls)?.tanh()?),
        }
    }
}

enum SequenceClassifier {
    Bert {
        encoder: bert::BertModel,
        head: ClassifierHead,
    },
    XlmRoberta(xlm_roberta::XLMRobertaForSequenceClassification),
}

/// Cross-encoder classifier producing one logit per input row.
#[derive(Clone)]
pub struct Classifier(Arc<SequenceClassifier>);

impl Classifier {
    /// Loads `config.json` and `model.safetensors` from `model_dir`.
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let model_dir = model_dir.as_ref();

        let raw_config = std::fs::read_to_string(model_dir.join("config.json"))?;
        let architecture = Architecture::from_config(&raw_config)?;

        let weights = model_dir.join("model.safetensors");
        // SAFETY: the snapshot file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, device)? };

        let model = match architecture {
            Architecture::XlmRoberta => {
                let config: xlm_roberta::Config = parse_config(&raw_config)?;
                SequenceClassifier::XlmRoberta(
                    xlm_roberta::XLMRobertaForSequenceClassification::new(1, &config, vb)?,
                )
            }
            Architecture::Bert => {
                let config: bert::Config = parse_config(&raw_config)?;
                let encoder_vb = ENCODER_PREFIXES
                    .iter()
                    .find(|prefix| {
                        vb.contains_tensor(&format!("{prefix}.embeddings.word_embeddings.weight"))
                    })
                    .map_or_else(|| vb.clone(), |prefix| vb.pp(*prefix));
                SequenceClassifier::Bert {
                    encoder: bert::BertModel::load(encoder_vb, &config)?,
                    head: ClassifierHead::load(vb, config.hidden_size)?,
                }
            }
        };

        Ok(Self(Arc::new(model)))
    }

    /// Returns logits shaped `[batch, 1]`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        match self.0.as_ref() {
            SequenceClassifier::Bert { encoder, head } => {
                let hidden = encoder.forward(input_ids, token_type_ids, Some(attention_mask))?;
                head.forward(&hidden.i((.., 0, ..))?)
            }
            SequenceClassifier::XlmRoberta(model) => {
                model.forward(input_ids, attention_mask, token_type_ids)
            }
        }
    }
}

fn parse_config<T: serde::de::DeserializeOwned>(raw_config: &str) -> Result<T> {
    serde_json::from_str(raw_config)
        .map_err(|e| candle_core::Error::Msg(format!("invalid config.json: {e}")))
}
