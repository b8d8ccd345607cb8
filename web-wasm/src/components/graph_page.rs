//! 知識グラフのページ
//!
//! 会話から蓄積されたノードと関係をプロフィールごとに表示する。

use leptos::prelude::*;
use leptos::task::spawn_local;
use photo_chat_common::KnowledgeGraph;

use crate::app::use_app;

#[component]
pub fn GraphPage() -> impl IntoView {
    let app = use_app();
    let graph = RwSignal::new(KnowledgeGraph::default());
    let loading = RwSignal::new(false);

    Effect::new(move |_| {
        let Some(profile) = app.session.with(|s| s.active_profile.clone()) else {
            return;
        };
        let coordinator = app.coordinator();
        loading.set(true);
        spawn_local(async move {
            match coordinator.knowledge_graph().await {
                Ok(loaded) => graph.set(loaded),
                Err(e) => {
                    tracing::warn!(profile = %profile, error = %e, "graph fetch failed");
                    graph.set(KnowledgeGraph::default());
                    app.report("Failed to load knowledge graph");
                }
            }
            loading.set(false);
        });
    });

    view! {
        <section class="graph-page">
            <h2>
                "Knowledge graph for "
                <span class="profile-name">{move || app.active_profile().unwrap_or_default()}</span>
            </h2>

            <Show
                when=move || !loading.get()
                fallback=|| view! { <p class="text-muted">"Loading graph..."</p> }
            >
                <Show
                    when=move || graph.with(|g| !g.is_empty())
                    fallback=|| view! { <p class="text-muted">"No data yet. Start chatting to populate it."</p> }
                >
                    <div class="graph-lists">
                        <h3>{move || format!("Nodes ({})", graph.with(|g| g.nodes.len()))}</h3>
                        <ul>
                            {move || graph.with(|g| {
                                g.nodes
                                    .iter()
                                    .map(|node| {
                                        let kind = node.kind.clone().map(|k| format!(" [{}]", k)).unwrap_or_default();
                                        view! { <li>{node.display_name().to_string()}{kind}</li> }
                                    })
                                    .collect_view()
                            })}
                        </ul>
                        <h3>{move || format!("Relations ({})", graph.with(|g| g.edges.len()))}</h3>
                        <ul>
                            {move || graph.with(|g| {
                                g.describe_edges()
                                    .into_iter()
                                    .map(|edge| view! { <li>{edge}</li> })
                                    .collect_view()
                            })}
                        </ul>
                    </div>
                </Show>
            </Show>
        </section>
    }
}
