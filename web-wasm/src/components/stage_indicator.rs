//! パイプラインの進捗表示

use leptos::prelude::*;
use photo_chat_common::{PipelineStage, PipelineState};

const STEPS: [(PipelineStage, &str); 3] = [
    (PipelineStage::Uploading, "Uploading"),
    (PipelineStage::Selecting, "Selecting"),
    (PipelineStage::SeedingContext, "Preparing chat"),
];

fn step_index(stage: PipelineStage) -> usize {
    match stage {
        PipelineStage::Precondition => 0,
        PipelineStage::Uploading => 1,
        PipelineStage::Selecting => 2,
        PipelineStage::SeedingContext => 3,
        PipelineStage::Ready => 4,
    }
}

/// 各段階の表示クラス（done / active / failed / 空）
fn step_class(state: PipelineState, step: PipelineStage) -> &'static str {
    let step = step_index(step);
    match state {
        PipelineState::Idle => "",
        PipelineState::Ready => "done",
        PipelineState::Running(current) => match step.cmp(&step_index(current)) {
            std::cmp::Ordering::Less => "done",
            std::cmp::Ordering::Equal => "active",
            std::cmp::Ordering::Greater => "",
        },
        PipelineState::Failed(at) => match step.cmp(&step_index(at)) {
            std::cmp::Ordering::Less => "done",
            std::cmp::Ordering::Equal => "failed",
            std::cmp::Ordering::Greater => "",
        },
    }
}

#[component]
pub fn StageIndicator(state: ReadSignal<PipelineState>) -> impl IntoView {
    view! {
        <Show when=move || state.get() != PipelineState::Idle>
            <ol class="stage-indicator">
                {STEPS
                    .into_iter()
                    .map(|(stage, label)| {
                        view! {
                            <li class=move || format!("stage {}", step_class(state.get(), stage))>
                                {label}
                            </li>
                        }
                    })
                    .collect_view()}
            </ol>
        </Show>
    }
}
