// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Integration tests for graph analysis: compile order, ownership checks and
//! per-frame binding.

use strata_core::math::{Extent2D, Region};
use strata_core::renderer::api::{
    BufferUsage, CommandBufferLevel, Format, ImageSubresourceRange, ImageViewType,
    MemoryLocation, PresentMode, QueueCapabilities, RenderPassDescriptor,
};
use strata_data::graph::{
    BufferNode, CommandBufferNode, CommandNode, CommandPoolNode, DescriptorResourceNode,
    DescriptorSetNode, DescriptorWriteNode, DeviceNode, FrameNode, FramebufferNode, ImageViewNode,
    QueueNode, SwapchainNode, ViewSource, WindowNode,
};
use strata_data::{Graph, GraphError, Node, NodeCategory, NodeKind, NodeRef, Ref};

/// Helper: a window, device, graphics queue and swapchain.
fn presentation_graph() -> (Graph, NodeRef, NodeRef) {
    let mut graph = Graph::new();
    let window = graph.add(Node::new(NodeKind::Window(WindowNode {
        title: "test".into(),
        extent: Extent2D::new(640, 480),
    })));
    graph.add(Node::new(NodeKind::Device(DeviceNode::default())));
    let queue = graph.add(
        Node::new(NodeKind::Queue(QueueNode {
            capabilities: QueueCapabilities::GRAPHICS | QueueCapabilities::PRESENT,
            family: None,
        }))
        .with_id("graphics-queue"),
    );
    let swapchain = graph.add(Node::new(NodeKind::Swapchain(SwapchainNode {
        window: window.into(),
        format: Format::Bgra8Srgb,
        min_image_count: 3,
        present_mode: PresentMode::Fifo,
    })));
    (graph, queue, swapchain)
}

fn swapchain_view(swapchain: NodeRef) -> Node {
    Node::new(NodeKind::ImageView(ImageViewNode {
        source: ViewSource::Swapchain(swapchain.into()),
        view_type: ImageViewType::D2,
        format: None,
        range: ImageSubresourceRange::default(),
    }))
}

fn uniform_buffer() -> Node {
    Node::new(NodeKind::Buffer(BufferNode {
        size: 256,
        usage: BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST,
        memory: MemoryLocation::HostVisible,
    }))
}

fn position(order: &[NodeRef], node: NodeRef) -> usize {
    order.iter().position(|&r| r == node).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Ordering
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_order_follows_categories_regardless_of_declaration() {
    let mut graph = Graph::new();
    let buffer = graph.add(uniform_buffer());
    let device = graph.add(Node::new(NodeKind::Device(DeviceNode::default())));
    let queue = graph.add(Node::new(NodeKind::Queue(QueueNode::default())));
    let pool = graph.add(Node::new(NodeKind::CommandPool(CommandPoolNode {
        queue: queue.into(),
        transient: false,
        resettable: true,
    })));

    let layout = graph.analyze().unwrap();
    assert_eq!(layout.order, vec![device, queue, pool, buffer]);

    let categories: Vec<NodeCategory> = layout
        .order
        .iter()
        .map(|r| graph.node(*r).unwrap().kind.category())
        .collect();
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);
}

#[test]
fn test_owned_dependencies_come_first_within_a_category() {
    let (mut graph, _, swapchain) = presentation_graph();
    let view = graph.add(swapchain_view(swapchain));
    // A view of a view lands in the same category as its source.
    let derived = graph.add(Node::new(NodeKind::ImageView(ImageViewNode {
        source: ViewSource::Image(view.into()),
        view_type: ImageViewType::D2,
        format: None,
        range: ImageSubresourceRange::default(),
    })));
    let layout = graph.analyze().unwrap();
    assert!(position(&layout.order, view) < position(&layout.order, derived));
}

#[test]
fn test_ownership_cycle_is_rejected() {
    let mut graph = Graph::new();
    let view = |source: u32| {
        Node::new(NodeKind::ImageView(ImageViewNode {
            source: ViewSource::Image(Ref::Node(NodeRef(source))),
            view_type: ImageViewType::D2,
            format: None,
            range: ImageSubresourceRange::default(),
        }))
    };
    graph.add(view(1));
    graph.add(view(0));

    assert_eq!(
        graph.analyze(),
        Err(GraphError::Cycle(vec![NodeRef(0), NodeRef(1)]))
    );
}

#[test]
fn test_owning_a_later_category_is_an_order_violation() {
    let mut graph = Graph::new();
    let buffer = graph.add(uniform_buffer());
    let pool = graph.add(Node::new(NodeKind::CommandPool(CommandPoolNode {
        queue: buffer.into(),
        transient: false,
        resettable: false,
    })));

    match graph.analyze() {
        Err(GraphError::OrderViolation {
            dependency,
            dependent,
            dependency_category,
            dependent_category,
        }) => {
            assert_eq!(dependency, buffer);
            assert_eq!(dependent, pool);
            assert_eq!(dependency_category, NodeCategory::Buffer);
            assert_eq!(dependent_category, NodeCategory::CommandPool);
        }
        other => panic!("expected an order violation, got {other:?}"),
    }
}

#[test]
fn test_dangling_direct_reference_is_rejected() {
    let mut graph = Graph::new();
    let pool = graph.add(Node::new(NodeKind::CommandPool(CommandPoolNode {
        queue: Ref::Node(NodeRef(42)),
        transient: false,
        resettable: false,
    })));
    assert_eq!(
        graph.analyze(),
        Err(GraphError::DanglingReference {
            node: pool,
            target: NodeRef(42)
        })
    );
}

#[test]
fn test_unknown_named_references_are_left_for_the_id_table() {
    let mut graph = Graph::new();
    graph.add(Node::new(NodeKind::CommandTree(CommandNode::List(vec![
        CommandNode::SetScissor(Region::FULL),
        CommandNode::BindVertexBuffers {
            first_binding: 0,
            buffers: vec![(Ref::named("registered-elsewhere"), 0)],
        },
    ]))));
    assert!(graph.analyze().is_ok());
}

#[test]
fn test_lookup_references_do_not_order_nodes() {
    let (mut graph, _, _) = presentation_graph();
    let pool = graph.add(Node::new(NodeKind::DescriptorPool(Default::default())));
    let set_layout = graph.add(Node::new(NodeKind::DescriptorSetLayout(Default::default())));
    // The write names a buffer declared after the set.
    graph.add(Node::new(NodeKind::DescriptorSet(DescriptorSetNode {
        pool: pool.into(),
        layout: set_layout.into(),
        writes: vec![DescriptorWriteNode {
            binding: 0,
            array_element: 0,
            resource: DescriptorResourceNode::Buffer {
                buffer: Ref::named("late-buffer"),
                offset: 0,
                range: None,
            },
        }],
    })));
    let late = graph.add(uniform_buffer().with_id("late-buffer"));

    let layout = graph.analyze().unwrap();
    assert_eq!(layout.order.len(), graph.len());
    assert!(graph.lookup_edges().iter().any(|(target, _)| *target == late));
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-frame binding
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_swapchain_views_are_always_per_frame() {
    let (mut graph, _, swapchain) = presentation_graph();
    let view = graph.add(swapchain_view(swapchain));
    let layout = graph.analyze().unwrap();
    assert_eq!(layout.swapchain_of(view), Some(swapchain));
}

#[test]
fn test_framebuffer_over_a_swapchain_view_is_promoted() {
    let (mut graph, _, swapchain) = presentation_graph();
    let view = graph.add(swapchain_view(swapchain));
    let render_pass = graph.add(Node::new(NodeKind::RenderPass(RenderPassDescriptor::default())));
    let framebuffer = graph.add(Node::new(NodeKind::Framebuffer(FramebufferNode {
        render_pass: render_pass.into(),
        attachments: vec![view.into()],
        extent: None,
        layers: 1,
    })));

    let layout = graph.analyze().unwrap();
    assert!(!graph.node(framebuffer).unwrap().per_frame);
    assert!(layout.is_per_frame(framebuffer));
    assert!(!layout.is_per_frame(render_pass));
}

#[test]
fn test_descriptor_set_writing_a_per_frame_buffer_is_promoted() {
    let (mut graph, _, swapchain) = presentation_graph();
    let buffer = graph.add(uniform_buffer().per_frame().with_id("camera-ubo"));
    let pool = graph.add(Node::new(NodeKind::DescriptorPool(Default::default())));
    let set_layout = graph.add(Node::new(NodeKind::DescriptorSetLayout(Default::default())));
    let set = graph.add(Node::new(NodeKind::DescriptorSet(DescriptorSetNode {
        pool: pool.into(),
        layout: set_layout.into(),
        writes: vec![DescriptorWriteNode {
            binding: 0,
            array_element: 0,
            resource: DescriptorResourceNode::Buffer {
                buffer: Ref::named("camera-ubo"),
                offset: 0,
                range: None,
            },
        }],
    })));

    let layout = graph.analyze().unwrap();
    assert_eq!(layout.swapchain_of(buffer), Some(swapchain));
    assert_eq!(layout.swapchain_of(set), Some(swapchain));
}

#[test]
fn test_flagged_node_uses_the_sole_swapchain() {
    let (mut graph, queue, swapchain) = presentation_graph();
    let pool = graph.add(Node::new(NodeKind::CommandPool(CommandPoolNode {
        queue: queue.into(),
        transient: false,
        resettable: true,
    })));
    let cb = graph.add(
        Node::new(NodeKind::CommandBuffer(CommandBufferNode {
            pool: pool.into(),
            level: CommandBufferLevel::Primary,
        }))
        .per_frame(),
    );

    let layout = graph.analyze().unwrap();
    assert_eq!(layout.swapchain_of(cb), Some(swapchain));
    assert_eq!(layout.swapchain_of(pool), None);
}

#[test]
fn test_explicit_frame_binding_selects_the_swapchain() {
    let (mut graph, _, first) = presentation_graph();
    let window = graph.add(Node::new(NodeKind::Window(WindowNode {
        title: "second".into(),
        extent: Extent2D::new(320, 240),
    })));
    let second = graph.add(Node::new(NodeKind::Swapchain(SwapchainNode {
        window: window.into(),
        format: Format::Bgra8Unorm,
        min_image_count: 2,
        present_mode: PresentMode::Mailbox,
    })));
    let frame = graph.add(Node::new(NodeKind::Frame(FrameNode {
        swapchain: second.into(),
        frames_in_flight: None,
    })));
    let semaphore = graph.add(Node::new(NodeKind::Semaphore).bound_to(frame));

    let layout = graph.analyze().unwrap();
    assert_eq!(layout.swapchain_of(semaphore), Some(second));
    assert_ne!(layout.swapchain_of(semaphore), Some(first));
}

#[test]
fn test_flagged_node_without_a_single_swapchain_is_unbound() {
    let (mut graph, _, _) = presentation_graph();
    let window = graph.add(Node::new(NodeKind::Window(WindowNode {
        title: "second".into(),
        extent: Extent2D::new(320, 240),
    })));
    graph.add(Node::new(NodeKind::Swapchain(SwapchainNode {
        window: window.into(),
        format: Format::Bgra8Unorm,
        min_image_count: 2,
        present_mode: PresentMode::Fifo,
    })));
    let semaphore = graph.add(Node::new(NodeKind::Semaphore).per_frame());

    assert_eq!(
        graph.analyze(),
        Err(GraphError::UnboundPerFrame(semaphore))
    );
}

#[test]
fn test_binding_to_a_non_frame_node_is_rejected() {
    let (mut graph, queue, _) = presentation_graph();
    let semaphore = graph.add(Node::new(NodeKind::Semaphore).bound_to(queue));
    assert_eq!(
        graph.analyze(),
        Err(GraphError::InvalidFrameBinding {
            node: semaphore,
            frame: queue
        })
    );
}

#[test]
fn test_device_level_nodes_cannot_be_per_frame() {
    let mut graph = Graph::new();
    let queue = graph.add(Node::new(NodeKind::Queue(QueueNode::default())).per_frame());
    assert_eq!(graph.analyze(), Err(GraphError::NotReplicable(queue)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Dependents
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_dependents_follow_ownership_and_lookups() {
    let (mut graph, _, swapchain) = presentation_graph();
    let view = graph.add(swapchain_view(swapchain).with_id("backbuffer"));
    let render_pass = graph.add(Node::new(NodeKind::RenderPass(RenderPassDescriptor::default())));
    let framebuffer = graph.add(
        Node::new(NodeKind::Framebuffer(FramebufferNode {
            render_pass: render_pass.into(),
            attachments: vec![view.into()],
            extent: None,
            layers: 1,
        }))
        .with_id("fb"),
    );
    let tree = graph.add(Node::new(NodeKind::CommandTree(CommandNode::RenderPass {
        render_pass: render_pass.into(),
        framebuffer: Ref::named("fb"),
        area: Region::FULL,
        clear_values: vec![],
        subpasses: vec![vec![]],
    })));
    let unrelated = graph.add(uniform_buffer());

    let closure = graph.dependents([swapchain]);
    assert!(closure.contains(&swapchain));
    assert!(closure.contains(&view));
    assert!(closure.contains(&framebuffer));
    assert!(closure.contains(&tree));
    assert!(!closure.contains(&render_pass));
    assert!(!closure.contains(&unrelated));
}
